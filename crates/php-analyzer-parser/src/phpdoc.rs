//! PHPDoc comment parser.
//!
//! Extracts the tags the analysis core consumes: @param, @return, @var,
//! @throws, @deprecated, @property and @method. Types parse into
//! [`TypeString`], so `Foo|Bar[]` and `?Foo` round into the atom model.

use php_analyzer_types::TypeString;

/// A `@param Type $name description` tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamTag {
    pub name: String,
    pub ty: TypeString,
    pub description: Option<String>,
}

/// A `@var Type [$name]` tag. The name is absent on tags that annotate the
/// immediately following assignment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarTag {
    pub name: Option<String>,
    pub ty: TypeString,
}

/// A `@property Type $name` tag (including -read/-write variants).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyTag {
    pub name: String,
    pub ty: TypeString,
    pub description: Option<String>,
}

/// A `@method [static] ReturnType name(Type $a, ...)` tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodTag {
    pub name: String,
    pub return_ty: TypeString,
    pub params: Vec<ParamTag>,
    pub is_static: bool,
}

/// Structured contents of one `/** ... */` comment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocComment {
    pub summary: Option<String>,
    pub params: Vec<ParamTag>,
    pub return_ty: TypeString,
    pub vars: Vec<VarTag>,
    pub throws: Vec<TypeString>,
    pub deprecated: Option<String>,
    pub properties: Vec<PropertyTag>,
    pub methods: Vec<MethodTag>,
}

impl DocComment {
    /// The `@param` type for a parameter name (without `$`).
    pub fn param_type(&self, name: &str) -> Option<&TypeString> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.ty)
            .filter(|ty| !ty.is_empty())
    }

    /// The `@var` type for a variable name (with `$`), or the unnamed tag.
    pub fn var_type(&self, name: Option<&str>) -> Option<&TypeString> {
        self.vars
            .iter()
            .find(|v| v.name.as_deref() == name)
            .map(|v| &v.ty)
            .filter(|ty| !ty.is_empty())
    }
}

/// Parse a full comment including the `/**` and `*/` markers.
pub fn parse_doc_comment(comment: &str) -> DocComment {
    let mut doc = DocComment::default();
    let mut summary_lines: Vec<&str> = Vec::new();
    let mut in_summary = true;

    for line in stripped_lines(comment) {
        if line.is_empty() {
            if in_summary && !summary_lines.is_empty() {
                in_summary = false;
            }
            continue;
        }
        if line.starts_with('@') {
            in_summary = false;
            parse_tag(line, &mut doc);
        } else if in_summary {
            summary_lines.push(line);
        }
    }

    if !summary_lines.is_empty() {
        doc.summary = Some(summary_lines.join(" "));
    }
    doc
}

fn stripped_lines(comment: &str) -> impl Iterator<Item = &str> {
    comment.lines().filter_map(|line| {
        let mut line = line.trim();
        if let Some(rest) = line.strip_prefix("/**") {
            line = rest.trim_start();
        }
        if line == "*/" {
            return None;
        }
        if let Some(rest) = line.strip_prefix('*') {
            line = rest.trim_start();
        }
        if let Some(rest) = line.strip_suffix("*/") {
            line = rest.trim_end();
        }
        Some(line)
    })
}

fn parse_tag(line: &str, doc: &mut DocComment) {
    if let Some(rest) = line.strip_prefix("@param") {
        if let Some(tag) = parse_param_tag(rest.trim()) {
            doc.params.push(tag);
        }
    } else if let Some(rest) = line.strip_prefix("@return") {
        if let Some(word) = first_word(rest.trim()) {
            doc.return_ty = TypeString::new(word);
        }
    } else if let Some(rest) = line.strip_prefix("@var") {
        doc.vars.push(parse_var_tag(rest.trim()));
    } else if let Some(rest) = line.strip_prefix("@throws") {
        if let Some(word) = first_word(rest.trim()) {
            doc.throws.push(TypeString::new(word));
        }
    } else if let Some(rest) = line.strip_prefix("@deprecated") {
        let rest = rest.trim();
        doc.deprecated = Some(if rest.is_empty() {
            "deprecated".to_string()
        } else {
            rest.to_string()
        });
    } else if let Some(rest) = line
        .strip_prefix("@property-read")
        .or_else(|| line.strip_prefix("@property-write"))
        .or_else(|| line.strip_prefix("@property"))
    {
        if let Some(tag) = parse_property_tag(rest.trim()) {
            doc.properties.push(tag);
        }
    } else if let Some(rest) = line.strip_prefix("@method") {
        if let Some(tag) = parse_method_tag(rest.trim()) {
            doc.methods.push(tag);
        }
    }
}

fn parse_param_tag(rest: &str) -> Option<ParamTag> {
    let mut parts = rest.splitn(3, char::is_whitespace);
    let first = parts.next()?;

    let (ty, name_token, description) = if first.starts_with('$') {
        (TypeString::empty(), first, parts.next())
    } else {
        let name = parts.next()?;
        if !name.starts_with('$') {
            return None;
        }
        (TypeString::new(first), name, parts.next())
    };

    Some(ParamTag {
        name: name_token.trim_start_matches('$').to_string(),
        ty,
        description: description.map(str::to_string),
    })
}

fn parse_var_tag(rest: &str) -> VarTag {
    let mut ty = TypeString::empty();
    let mut name = None;
    for token in rest.split_whitespace() {
        if token.starts_with('$') {
            if name.is_none() {
                name = Some(variable_token(token));
            }
        } else if ty.is_empty() {
            ty = TypeString::new(token);
        }
    }
    VarTag { name, ty }
}

fn variable_token(token: &str) -> String {
    token
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
        .collect()
}

fn parse_property_tag(rest: &str) -> Option<PropertyTag> {
    let mut parts = rest.splitn(3, char::is_whitespace);
    let ty = parts.next()?;
    let name = parts.next()?;
    if !name.starts_with('$') {
        return None;
    }
    Some(PropertyTag {
        name: variable_token(name),
        ty: TypeString::new(ty),
        description: parts.next().map(str::to_string),
    })
}

fn parse_method_tag(rest: &str) -> Option<MethodTag> {
    let (is_static, rest) = match rest.strip_prefix("static ") {
        Some(r) => (true, r.trim_start()),
        None => (false, rest),
    };

    let paren = rest.find('(')?;
    let close = rest[paren..].find(')')? + paren;
    let before = rest[..paren].trim();

    let (return_ty, name) = match before.rsplit_once(char::is_whitespace) {
        Some((ty, name)) => (TypeString::new(ty.trim()), name),
        None => (TypeString::empty(), before),
    };
    if name.is_empty() {
        return None;
    }

    let params = rest[paren + 1..close]
        .split(',')
        .filter_map(|p| {
            let p = p.trim();
            if p.is_empty() {
                return None;
            }
            match p.rsplit_once(char::is_whitespace) {
                Some((ty, name)) if name.starts_with('$') => Some(ParamTag {
                    name: name.trim_start_matches('$').to_string(),
                    ty: TypeString::new(ty.trim()),
                    description: None,
                }),
                _ => p.strip_prefix('$').map(|name| ParamTag {
                    name: name.to_string(),
                    ty: TypeString::empty(),
                    description: None,
                }),
            }
        })
        .collect();

    Some(MethodTag {
        name: name.to_string(),
        return_ty,
        params,
        is_static,
    })
}

fn first_word(s: &str) -> Option<&str> {
    s.split_whitespace().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let doc = parse_doc_comment("/** Makes widgets. */");
        assert_eq!(doc.summary.as_deref(), Some("Makes widgets."));
    }

    #[test]
    fn test_multiline_summary_stops_at_blank() {
        let doc = parse_doc_comment("/**\n * First.\n * Second.\n *\n * Ignored body.\n */");
        assert_eq!(doc.summary.as_deref(), Some("First. Second."));
    }

    #[test]
    fn test_param_tags() {
        let doc = parse_doc_comment("/**\n * @param string $name The name\n * @param $untyped\n */");
        assert_eq!(doc.params.len(), 2);
        assert_eq!(doc.params[0].name, "name");
        assert_eq!(doc.params[0].ty, TypeString::new("string"));
        assert_eq!(doc.params[0].description.as_deref(), Some("The name"));
        assert!(doc.params[1].ty.is_empty());
        assert_eq!(doc.param_type("name"), Some(&TypeString::new("string")));
        assert_eq!(doc.param_type("untyped"), None);
    }

    #[test]
    fn test_return_union_and_array() {
        let doc = parse_doc_comment("/** @return Foo|Bar[]|null */");
        assert_eq!(doc.return_ty, TypeString::new("Foo|Bar[]|null"));
    }

    #[test]
    fn test_var_tag_named_and_unnamed() {
        let doc = parse_doc_comment("/** @var \\X $x */");
        assert_eq!(doc.vars[0].name.as_deref(), Some("$x"));
        assert_eq!(doc.vars[0].ty, TypeString::new("\\X"));
        assert_eq!(doc.var_type(Some("$x")), Some(&TypeString::new("\\X")));

        let doc = parse_doc_comment("/** @var int */");
        assert_eq!(doc.vars[0].name, None);
        assert_eq!(doc.var_type(None), Some(&TypeString::new("int")));
    }

    #[test]
    fn test_throws_and_deprecated() {
        let doc = parse_doc_comment("/**\n * @throws \\RuntimeException\n * @deprecated use b()\n */");
        assert_eq!(doc.throws.len(), 1);
        assert_eq!(doc.deprecated.as_deref(), Some("use b()"));
    }

    #[test]
    fn test_property_tags() {
        let doc = parse_doc_comment("/**\n * @property string $name\n * @property-read int $id\n */");
        assert_eq!(doc.properties.len(), 2);
        assert_eq!(doc.properties[0].name, "$name");
        assert_eq!(doc.properties[1].name, "$id");
    }

    #[test]
    fn test_method_tag_with_params() {
        let doc = parse_doc_comment("/** @method static Foo create(int $x, $y) */");
        let m = &doc.methods[0];
        assert!(m.is_static);
        assert_eq!(m.name, "create");
        assert_eq!(m.return_ty, TypeString::new("Foo"));
        assert_eq!(m.params.len(), 2);
        assert_eq!(m.params[0].name, "x");
        assert_eq!(m.params[0].ty, TypeString::new("int"));
        assert_eq!(m.params[1].name, "y");
    }

    #[test]
    fn test_nullable_shorthand() {
        let doc = parse_doc_comment("/** @return ?Foo */");
        assert_eq!(doc.return_ty, TypeString::new("Foo|null"));
    }
}
