//! Payload formatting: hover signatures and signature-help shapes.

use lsp_types::{
    Documentation, ParameterInformation, ParameterLabel, SignatureInformation,
};
use php_analyzer_types::{Symbol, SymbolKind, TypeString, Visibility};

/// Render a type for display: class atoms get their leading backslash
/// back, primitives stay bare.
pub fn display_type(ty: &TypeString) -> String {
    let atoms: Vec<String> = ty
        .atoms()
        .iter()
        .map(|atom| {
            let base = atom.trim_end_matches("[]");
            if base.is_empty()
                || atom.starts_with('\\')
                || php_analyzer_types::typestring::is_primitive(base)
            {
                atom.clone()
            } else {
                format!("\\{}", atom)
            }
        })
        .collect();
    atoms.join("|")
}

/// The code-formatted signature line shown on hover.
pub fn hover_signature(symbol: &Symbol) -> String {
    match symbol.kind {
        SymbolKind::Class => format!("class \\{}", symbol.name),
        SymbolKind::Interface => format!("interface \\{}", symbol.name),
        SymbolKind::Trait => format!("trait \\{}", symbol.name),
        SymbolKind::Namespace => format!("namespace {}", symbol.name),
        SymbolKind::Function | SymbolKind::Method | SymbolKind::Constructor => {
            let mut out = String::new();
            if symbol.visibility != Visibility::Public {
                out.push_str(match symbol.visibility {
                    Visibility::Protected => "protected ",
                    Visibility::Private => "private ",
                    Visibility::Public => "",
                });
            }
            if symbol.modifiers.is_static {
                out.push_str("static ");
            }
            out.push_str("function ");
            out.push_str(symbol.member_name());
            out.push('(');
            out.push_str(&parameter_list(symbol));
            out.push(')');
            if !symbol.ty.is_empty() {
                out.push_str(": ");
                out.push_str(&display_type(&symbol.ty));
            }
            out
        }
        SymbolKind::Property => {
            let mut out = String::new();
            if !symbol.ty.is_empty() {
                out.push_str(&display_type(&symbol.ty));
                out.push(' ');
            }
            out.push_str(symbol.member_name());
            out
        }
        SymbolKind::Constant | SymbolKind::ClassConstant => match &symbol.value {
            Some(value) => format!("const {} = {}", symbol.member_name(), value),
            None => format!("const {}", symbol.member_name()),
        },
        SymbolKind::Parameter | SymbolKind::Variable => variable_hover(&symbol.name, &symbol.ty),
        SymbolKind::File => symbol.name.clone(),
    }
}

/// `\X $x` for a typed variable, `$x` for an untyped one.
pub fn variable_hover(name: &str, ty: &TypeString) -> String {
    if ty.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", display_type(ty), name)
    }
}

/// One signature-help entry for a callable symbol.
pub fn signature_information(symbol: &Symbol) -> SignatureInformation {
    let params: Vec<&Symbol> = symbol
        .children
        .iter()
        .filter(|c| c.kind == SymbolKind::Parameter)
        .collect();
    let rendered: Vec<String> = params.iter().map(|p| parameter_text(p)).collect();

    let mut label = format!("{}({})", symbol.member_name(), rendered.join(", "));
    if !symbol.ty.is_empty() {
        label.push_str(": ");
        label.push_str(&display_type(&symbol.ty));
    }

    SignatureInformation {
        label,
        documentation: symbol
            .doc
            .as_ref()
            .and_then(|d| d.summary.clone())
            .map(Documentation::String),
        parameters: Some(
            rendered
                .into_iter()
                .map(|text| ParameterInformation {
                    label: ParameterLabel::Simple(text),
                    documentation: None,
                })
                .collect(),
        ),
        active_parameter: None,
    }
}

fn parameter_list(symbol: &Symbol) -> String {
    let params: Vec<String> = symbol
        .children
        .iter()
        .filter(|c| c.kind == SymbolKind::Parameter)
        .map(parameter_text)
        .collect();
    params.join(", ")
}

fn parameter_text(param: &Symbol) -> String {
    let mut out = String::new();
    if !param.ty.is_empty() {
        out.push_str(&display_type(&param.ty));
        out.push(' ');
    }
    out.push_str(&param.name);
    if let Some(default) = &param.value {
        out.push_str(" = ");
        out.push_str(default);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use php_analyzer_types::{Position, Range};

    fn range() -> Range {
        Range::new(Position::new(0, 0), Position::new(0, 1))
    }

    fn method() -> Symbol {
        let mut m = Symbol::new(SymbolKind::Method, "A\\B\\Foo::bar", range());
        m.ty = TypeString::new("int");
        m
    }

    #[test]
    fn test_display_type_restores_backslashes() {
        assert_eq!(display_type(&TypeString::new("A\\B\\Foo|int")), "\\A\\B\\Foo|int");
        assert_eq!(display_type(&TypeString::new("Foo[]")), "\\Foo[]");
        assert_eq!(display_type(&TypeString::new("string|null")), "string|null");
    }

    #[test]
    fn test_hover_signature_method() {
        assert_eq!(hover_signature(&method()), "function bar(): int");
    }

    #[test]
    fn test_hover_signature_method_with_params() {
        let mut m = method();
        let mut p = Symbol::new(SymbolKind::Parameter, "$x", range());
        p.ty = TypeString::new("string");
        p.value = Some("'d'".to_string());
        m.children.push(p);
        assert_eq!(hover_signature(&m), "function bar(string $x = 'd'): int");
    }

    #[test]
    fn test_hover_signature_class_and_const() {
        let class = Symbol::new(SymbolKind::Class, "A\\B\\Foo", range());
        assert_eq!(hover_signature(&class), "class \\A\\B\\Foo");

        let mut constant = Symbol::new(SymbolKind::ClassConstant, "A\\B\\Foo::MAX", range());
        constant.value = Some("10".to_string());
        assert_eq!(hover_signature(&constant), "const MAX = 10");
    }

    #[test]
    fn test_variable_hover() {
        assert_eq!(variable_hover("$x", &TypeString::new("X")), "\\X $x");
        assert_eq!(variable_hover("$x", &TypeString::empty()), "$x");
    }

    #[test]
    fn test_signature_information() {
        let mut m = method();
        let mut p = Symbol::new(SymbolKind::Parameter, "$x", range());
        p.ty = TypeString::new("string");
        m.children.push(p);

        let info = signature_information(&m);
        assert_eq!(info.label, "bar(string $x): int");
        assert_eq!(info.parameters.unwrap().len(), 1);
    }
}
