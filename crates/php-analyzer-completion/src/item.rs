//! Build LSP completion items from symbols.

use crate::context::CompletionContext;
use lsp_types::{CompletionItem, CompletionItemKind, InsertTextFormat, TextEdit};
use php_analyzer_types::{Symbol, SymbolKind};

/// Convert a symbol to a completion item. `rank` feeds `sort_text` so the
/// store's ranking survives the client's own sorting.
pub fn symbol_item(symbol: &Symbol, rank: usize) -> CompletionItem {
    let label = symbol.display_name().to_string();

    CompletionItem {
        label,
        kind: Some(completion_kind(symbol.kind)),
        detail: Some(detail(symbol)),
        documentation: symbol
            .doc
            .as_ref()
            .and_then(|d| d.summary.clone())
            .map(lsp_types::Documentation::String),
        sort_text: Some(format!("{:04}", rank)),
        data: Some(serde_json::Value::String(symbol.name.clone())),
        ..Default::default()
    }
}

/// A keyword item, sorted after symbols.
pub fn keyword_item(keyword: &str) -> CompletionItem {
    CompletionItem {
        label: keyword.to_string(),
        kind: Some(CompletionItemKind::KEYWORD),
        sort_text: Some(format!("9999-{}", keyword)),
        ..Default::default()
    }
}

/// Signature-shaped detail string: `(int $x, string $y): Foo` for
/// callables, the type for everything else.
pub fn detail(symbol: &Symbol) -> String {
    if symbol.kind.is_callable() {
        let params: Vec<String> = symbol
            .children
            .iter()
            .filter(|c| c.kind == SymbolKind::Parameter)
            .map(|p| {
                let mut s = String::new();
                if !p.ty.is_empty() {
                    s.push_str(&p.ty.to_string());
                    s.push(' ');
                }
                s.push_str(&p.name);
                if let Some(default) = &p.value {
                    s.push_str(" = ");
                    s.push_str(default);
                }
                s
            })
            .collect();
        let mut out = format!("({})", params.join(", "));
        if !symbol.ty.is_empty() {
            out.push_str(": ");
            out.push_str(&symbol.ty.to_string());
        }
        out
    } else if !symbol.ty.is_empty() {
        symbol.ty.to_string()
    } else {
        symbol.name.clone()
    }
}

/// A `use` statement edit importing `fqn`, when the name would not resolve
/// at the cursor as written. Inserted after the last existing import, or
/// after the namespace declaration.
pub fn use_statement_edit(ctx: &CompletionContext, fqn: &str) -> Option<Vec<TextEdit>> {
    let last_segment = fqn.rsplit('\\').next().unwrap_or(fqn);
    if ctx
        .resolver
        .resolve(last_segment, SymbolKind::Class)
        .eq_ignore_ascii_case(fqn)
    {
        return None;
    }

    let mut insert_line: Option<u32> = None;
    for symbol in ctx.table.iter() {
        if symbol.modifiers.is_import || symbol.kind == SymbolKind::Namespace {
            let candidate = symbol.selection_range.end.line + 1;
            insert_line = Some(insert_line.map_or(candidate, |l: u32| l.max(candidate)));
        }
    }
    let line = insert_line.unwrap_or(1);

    let position = lsp_types::Position { line, character: 0 };
    Some(vec![TextEdit {
        range: lsp_types::Range {
            start: position,
            end: position,
        },
        new_text: format!("use {};\n", fqn),
    }])
}

/// An override stub for an inherited method, offered in declaration
/// headers.
pub fn override_item(symbol: &Symbol, rank: usize) -> CompletionItem {
    let params: Vec<String> = symbol
        .children
        .iter()
        .filter(|c| c.kind == SymbolKind::Parameter)
        .map(|p| {
            let mut s = String::new();
            if !p.ty.is_empty() {
                s.push_str(&p.ty.to_string());
                s.push(' ');
            }
            s.push_str(&p.name);
            s
        })
        .collect();
    let name = symbol.member_name();

    let mut item = symbol_item(symbol, rank);
    item.label = name.to_string();
    item.insert_text = Some(format!("{}({})", name, params.join(", ")));
    item.insert_text_format = Some(InsertTextFormat::PLAIN_TEXT);
    item
}

pub fn completion_kind(kind: SymbolKind) -> CompletionItemKind {
    match kind {
        SymbolKind::Namespace => CompletionItemKind::MODULE,
        SymbolKind::Class => CompletionItemKind::CLASS,
        SymbolKind::Interface => CompletionItemKind::INTERFACE,
        SymbolKind::Trait => CompletionItemKind::INTERFACE,
        SymbolKind::Method => CompletionItemKind::METHOD,
        SymbolKind::Function => CompletionItemKind::FUNCTION,
        SymbolKind::Property => CompletionItemKind::PROPERTY,
        SymbolKind::Constant | SymbolKind::ClassConstant => CompletionItemKind::CONSTANT,
        SymbolKind::Parameter | SymbolKind::Variable => CompletionItemKind::VARIABLE,
        SymbolKind::Constructor => CompletionItemKind::CONSTRUCTOR,
        SymbolKind::File => CompletionItemKind::FILE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use php_analyzer_types::{Position, Range, TypeString};

    fn range() -> Range {
        Range::new(Position::new(0, 0), Position::new(0, 1))
    }

    fn method_with_params() -> Symbol {
        let mut method = Symbol::new(SymbolKind::Method, "App\\Foo::bar", range());
        method.ty = TypeString::new("int");
        let mut param = Symbol::new(SymbolKind::Parameter, "$x", range());
        param.ty = TypeString::new("string");
        param.value = Some("'d'".to_string());
        method.children.push(param);
        method
    }

    #[test]
    fn test_symbol_item_for_method() {
        let item = symbol_item(&method_with_params(), 3);
        assert_eq!(item.label, "bar");
        assert_eq!(item.kind, Some(CompletionItemKind::METHOD));
        assert_eq!(item.detail.as_deref(), Some("(string $x = 'd'): int"));
        assert_eq!(item.sort_text.as_deref(), Some("0003"));
    }

    #[test]
    fn test_property_label_strips_dollar_for_instance() {
        let mut prop = Symbol::new(SymbolKind::Property, "App\\Foo::$name", range());
        prop.ty = TypeString::new("string");
        let item = symbol_item(&prop, 0);
        assert_eq!(item.label, "name");

        prop.modifiers.is_static = true;
        let item = symbol_item(&prop, 0);
        assert_eq!(item.label, "$name");
    }

    #[test]
    fn test_override_item_inserts_signature() {
        let item = override_item(&method_with_params(), 0);
        assert_eq!(item.insert_text.as_deref(), Some("bar(string $x)"));
    }

    #[test]
    fn test_keyword_sorts_last() {
        let keyword = keyword_item("class");
        let symbol = symbol_item(&method_with_params(), 42);
        assert!(keyword.sort_text.unwrap() > symbol.sort_text.unwrap());
    }
}
