//! The closed set of completion strategies.
//!
//! Consulted in priority order; the first whose `can_suggest` matches the
//! cursor answers. Every strategy caps its list at `max_items` and flags
//! the response incomplete when matches overflowed.

use crate::context::CompletionContext;
use crate::item::{
    keyword_item, override_item, symbol_item, use_statement_edit,
};
use lsp_types::{CompletionItem, CompletionList};
use php_analyzer_index::member_visible;
use php_analyzer_index::MergeStrategy;
use php_analyzer_types::{Symbol, SymbolKind, TypeString};

pub trait CompletionStrategy {
    fn can_suggest(&self, ctx: &CompletionContext) -> bool;
    fn completions(&self, ctx: &CompletionContext, max_items: usize) -> CompletionList;
}

/// The strategy list, in consultation order.
pub fn default_strategies() -> Vec<Box<dyn CompletionStrategy>> {
    vec![
        Box::new(ClassTypeDesignator),
        Box::new(ScopedAccess),
        Box::new(ObjectAccess),
        Box::new(SimpleVariable),
        Box::new(TypeDeclaration),
        Box::new(ClassBaseClause),
        Box::new(InterfaceClause),
        Box::new(UseTrait),
        Box::new(NamespaceDefinition),
        Box::new(NamespaceUse),
        Box::new(MethodDeclarationHeader),
        Box::new(DeclarationBody),
        Box::new(NameCompletion),
    ]
}

const MEMBER_KEYWORDS: &[&str] = &[
    "public", "protected", "private", "static", "abstract", "final", "function", "const", "var",
    "use",
];

const TYPE_KEYWORDS: &[&str] = &[
    "int", "float", "string", "bool", "array", "callable", "iterable", "object", "mixed", "void",
    "self", "static", "null",
];

const NAME_KEYWORDS: &[&str] = &[
    "class", "interface", "trait", "function", "const", "namespace", "use", "new", "return", "if",
    "else", "elseif", "foreach", "for", "while", "switch", "match", "try", "catch", "finally",
    "throw", "echo", "instanceof", "global", "static", "clone", "print", "require", "include",
    "require_once", "include_once",
];

// --- After `new`: class instantiation targets ---------------------------

struct ClassTypeDesignator;

impl CompletionStrategy for ClassTypeDesignator {
    fn can_suggest(&self, ctx: &CompletionContext) -> bool {
        ends_with_keyword(base_before_word(ctx), "new")
    }

    fn completions(&self, ctx: &CompletionContext, max_items: usize) -> CompletionList {
        let filter = |s: &Symbol| s.kind == SymbolKind::Class && !s.modifiers.is_abstract;
        let hits = prefix_or_browse(ctx, ctx.word_prefix(), max_items, filter);
        let is_incomplete = hits.len() >= max_items;
        let items = hits
            .iter()
            .enumerate()
            .map(|(rank, symbol)| {
                let mut item = symbol_item(symbol, rank);
                item.label = symbol.last_segment().to_string();
                item.detail = Some(symbol.name.clone());
                item.additional_text_edits = use_statement_edit(ctx, &symbol.name);
                item
            })
            .collect();
        list(items, is_incomplete)
    }
}

// --- After `::`: static members -----------------------------------------

struct ScopedAccess;

impl CompletionStrategy for ScopedAccess {
    fn can_suggest(&self, ctx: &CompletionContext) -> bool {
        base_before_member(ctx).ends_with("::")
    }

    fn completions(&self, ctx: &CompletionContext, max_items: usize) -> CompletionList {
        let member_prefix = member_prefix(ctx);
        let operator_end = ctx.offset - member_prefix.len();
        let receiver = contextualize(ctx, ctx.receiver_type(operator_end));
        let caller = ctx.enclosing_class_fqn();

        let bare = member_prefix.trim_start_matches('$');
        let mut items: Vec<CompletionItem> = Vec::new();
        let mut seen: Vec<String> = Vec::new();
        for class in receiver.atomic_class_names() {
            let members = ctx.store.find_members(&class, MergeStrategy::Documented, |s| {
                static_member(s)
                    && member_visible(ctx.store, s, caller)
                    && s.display_name()
                        .trim_start_matches('$')
                        .to_lowercase()
                        .starts_with(&bare.to_lowercase())
            });
            for member in members {
                if seen.contains(&member.symbol.name) {
                    continue;
                }
                seen.push(member.symbol.name.clone());
                let rank = rank_magic_last(items.len(), member.symbol.member_name());
                items.push(symbol_item(&member.symbol, rank));
            }
        }
        truncate(items, max_items)
    }
}

fn static_member(symbol: &Symbol) -> bool {
    match symbol.kind {
        SymbolKind::ClassConstant => true,
        SymbolKind::Property => symbol.modifiers.is_static,
        SymbolKind::Method | SymbolKind::Constructor => true,
        _ => false,
    }
}

// --- After `->`: instance members ---------------------------------------

struct ObjectAccess;

impl CompletionStrategy for ObjectAccess {
    fn can_suggest(&self, ctx: &CompletionContext) -> bool {
        base_before_member(ctx).ends_with("->")
    }

    fn completions(&self, ctx: &CompletionContext, max_items: usize) -> CompletionList {
        let member_prefix = member_prefix(ctx);
        let operator_end = ctx.offset - member_prefix.len();
        let receiver = contextualize(ctx, ctx.receiver_type(operator_end));
        let caller = ctx.enclosing_class_fqn();

        let mut items: Vec<CompletionItem> = Vec::new();
        let mut seen: Vec<String> = Vec::new();
        for class in receiver.atomic_class_names() {
            let members = ctx.store.find_members(&class, MergeStrategy::Documented, |s| {
                instance_member(s)
                    && member_visible(ctx.store, s, caller)
                    && s.display_name()
                        .to_lowercase()
                        .starts_with(&member_prefix.to_lowercase())
            });
            for member in members {
                if seen.contains(&member.symbol.name) {
                    continue;
                }
                seen.push(member.symbol.name.clone());
                let rank = rank_magic_last(items.len(), member.symbol.member_name());
                items.push(symbol_item(&member.symbol, rank));
            }
        }
        truncate(items, max_items)
    }
}

fn instance_member(symbol: &Symbol) -> bool {
    match symbol.kind {
        SymbolKind::Method => true,
        SymbolKind::Property => !symbol.modifiers.is_static,
        _ => false,
    }
}

// --- After `$`: variables ------------------------------------------------

struct SimpleVariable;

impl CompletionStrategy for SimpleVariable {
    fn can_suggest(&self, ctx: &CompletionContext) -> bool {
        base_before_word(ctx).ends_with('$')
    }

    fn completions(&self, ctx: &CompletionContext, max_items: usize) -> CompletionList {
        let prefix = ctx.word_prefix().to_lowercase();
        let mut items: Vec<CompletionItem> = Vec::new();

        if ctx.enclosing_class_fqn().is_some() && "this".starts_with(&prefix) {
            items.push(CompletionItem {
                label: "$this".to_string(),
                kind: Some(lsp_types::CompletionItemKind::VARIABLE),
                detail: ctx.enclosing_class_fqn().map(str::to_string),
                sort_text: Some("0000".to_string()),
                ..Default::default()
            });
        }

        for (rank, variable) in ctx.visible_variables().into_iter().enumerate() {
            let bare = variable.name.trim_start_matches('$');
            if !bare.to_lowercase().starts_with(&prefix) {
                continue;
            }
            items.push(symbol_item(variable, rank + 1));
        }
        truncate(items, max_items)
    }
}

// --- Inside a type annotation -------------------------------------------

struct TypeDeclaration;

impl CompletionStrategy for TypeDeclaration {
    fn can_suggest(&self, ctx: &CompletionContext) -> bool {
        ctx.enclosing(&[
            "named_type",
            "optional_type",
            "union_type",
            "intersection_type",
        ])
        .is_some()
            && !ctx.word_prefix().is_empty()
    }

    fn completions(&self, ctx: &CompletionContext, max_items: usize) -> CompletionList {
        let prefix = ctx.word_prefix();
        let filter = |s: &Symbol| s.kind.is_class_like();
        let hits = prefix_or_browse(ctx, prefix, max_items, filter);
        let is_incomplete = hits.len() >= max_items;

        let mut items: Vec<CompletionItem> = hits
            .iter()
            .enumerate()
            .map(|(rank, symbol)| {
                let mut item = symbol_item(symbol, rank);
                item.label = symbol.last_segment().to_string();
                item.detail = Some(symbol.name.clone());
                item
            })
            .collect();
        for keyword in TYPE_KEYWORDS {
            if keyword.starts_with(&prefix.to_lowercase()) {
                items.push(keyword_item(keyword));
            }
        }
        list(items, is_incomplete)
    }
}

// --- extends / implements / use-trait clauses ---------------------------

struct ClassBaseClause;

impl CompletionStrategy for ClassBaseClause {
    fn can_suggest(&self, ctx: &CompletionContext) -> bool {
        ends_with_keyword(base_before_word(ctx), "extends")
            || ctx.enclosing(&["base_clause"]).is_some()
    }

    fn completions(&self, ctx: &CompletionContext, max_items: usize) -> CompletionList {
        let in_interface = ctx
            .enclosing(&["interface_declaration", "class_declaration"])
            .map(|n| n.kind() == "interface_declaration")
            .unwrap_or(false);
        let filter = move |s: &Symbol| {
            if in_interface {
                s.kind == SymbolKind::Interface
            } else {
                s.kind == SymbolKind::Class && !s.modifiers.is_final
            }
        };
        class_name_list(ctx, max_items, filter)
    }
}

struct InterfaceClause;

impl CompletionStrategy for InterfaceClause {
    fn can_suggest(&self, ctx: &CompletionContext) -> bool {
        ends_with_keyword(base_before_word(ctx), "implements")
            || ctx.enclosing(&["class_interface_clause"]).is_some()
    }

    fn completions(&self, ctx: &CompletionContext, max_items: usize) -> CompletionList {
        class_name_list(ctx, max_items, |s| s.kind == SymbolKind::Interface)
    }
}

struct UseTrait;

impl CompletionStrategy for UseTrait {
    fn can_suggest(&self, ctx: &CompletionContext) -> bool {
        in_class_body(ctx) && ends_with_keyword(base_before_word(ctx), "use")
    }

    fn completions(&self, ctx: &CompletionContext, max_items: usize) -> CompletionList {
        class_name_list(ctx, max_items, |s| s.kind == SymbolKind::Trait)
    }
}

// --- namespace definitions and use statements ---------------------------

struct NamespaceDefinition;

impl CompletionStrategy for NamespaceDefinition {
    fn can_suggest(&self, ctx: &CompletionContext) -> bool {
        let base = {
            let lp = ctx.line_prefix();
            &lp[..lp.len() - ctx.qualified_prefix().len()]
        };
        ends_with_keyword(base, "namespace")
    }

    fn completions(&self, ctx: &CompletionContext, max_items: usize) -> CompletionList {
        let prefix = ctx.qualified_prefix();
        let hits = if prefix.is_empty() {
            browse(ctx, max_items, |s| s.kind == SymbolKind::Namespace)
        } else {
            ctx.store
                .match_(prefix, |s| s.kind == SymbolKind::Namespace)
                .into_iter()
                .map(|h| h.symbol)
                .take(max_items)
                .collect()
        };
        let is_incomplete = hits.len() >= max_items;
        let items = hits
            .iter()
            .enumerate()
            .map(|(rank, s)| {
                let mut item = symbol_item(s, rank);
                item.label = s.name.clone();
                item.insert_text = Some(s.name.clone());
                item
            })
            .collect();
        list(items, is_incomplete)
    }
}

struct NamespaceUse;

impl CompletionStrategy for NamespaceUse {
    fn can_suggest(&self, ctx: &CompletionContext) -> bool {
        if in_class_body(ctx) {
            return false;
        }
        ctx.enclosing(&[
            "namespace_use_declaration",
            "namespace_use_clause",
            "namespace_use_group",
        ])
        .is_some()
            || ends_with_keyword(
                {
                    let lp = ctx.line_prefix();
                    &lp[..lp.len() - ctx.qualified_prefix().len()]
                },
                "use",
            )
    }

    fn completions(&self, ctx: &CompletionContext, max_items: usize) -> CompletionList {
        let prefix = ctx.qualified_prefix();
        if prefix.is_empty() {
            return list(Vec::new(), false);
        }
        let hits = ctx.store.match_(prefix, |s| {
            s.kind.is_class_like()
                || matches!(s.kind, SymbolKind::Function | SymbolKind::Constant)
        });
        let is_incomplete = hits.len() > max_items;
        let items = hits
            .into_iter()
            .take(max_items)
            .enumerate()
            .map(|(rank, h)| {
                let mut item = symbol_item(&h.symbol, rank);
                item.label = h.symbol.last_segment().to_string();
                item.detail = Some(h.symbol.name.clone());
                item.insert_text = Some(h.symbol.name.clone());
                item.filter_text = Some(h.symbol.name.clone());
                item
            })
            .collect();
        list(items, is_incomplete)
    }
}

// --- method declaration headers: inherited overrides --------------------

struct MethodDeclarationHeader;

impl CompletionStrategy for MethodDeclarationHeader {
    fn can_suggest(&self, ctx: &CompletionContext) -> bool {
        in_class_body(ctx) && ends_with_keyword(base_before_word(ctx), "function")
    }

    fn completions(&self, ctx: &CompletionContext, max_items: usize) -> CompletionList {
        let Some(class) = ctx.enclosing_class_fqn() else {
            return list(Vec::new(), false);
        };
        let class = class.to_string();
        let prefix = ctx.word_prefix().to_lowercase();

        let inherited = ctx.store.find_members(&class, MergeStrategy::Override, |s| {
            s.kind == SymbolKind::Method
                && s.scope.as_deref() != Some(class.as_str())
                && !s.modifiers.is_final
                && s.visibility != php_analyzer_types::Visibility::Private
                && s.member_name().to_lowercase().starts_with(&prefix)
        });
        let is_incomplete = inherited.len() > max_items;
        let items = inherited
            .into_iter()
            .take(max_items)
            .enumerate()
            .map(|(rank, h)| override_item(&h.symbol, rank))
            .collect();
        list(items, is_incomplete)
    }
}

// --- class body keywords -------------------------------------------------

struct DeclarationBody;

impl CompletionStrategy for DeclarationBody {
    fn can_suggest(&self, ctx: &CompletionContext) -> bool {
        in_class_body(ctx)
    }

    fn completions(&self, ctx: &CompletionContext, _max_items: usize) -> CompletionList {
        let prefix = ctx.word_prefix().to_lowercase();
        let items = MEMBER_KEYWORDS
            .iter()
            .filter(|k| k.starts_with(&prefix))
            .map(|k| keyword_item(k))
            .collect();
        list(items, false)
    }
}

// --- catch-all name completion ------------------------------------------

struct NameCompletion;

impl CompletionStrategy for NameCompletion {
    fn can_suggest(&self, ctx: &CompletionContext) -> bool {
        !ctx.qualified_prefix().is_empty()
    }

    fn completions(&self, ctx: &CompletionContext, max_items: usize) -> CompletionList {
        let prefix = ctx.qualified_prefix();
        let hits = ctx.store.match_(prefix, |s| {
            s.kind.is_class_like()
                || matches!(s.kind, SymbolKind::Function | SymbolKind::Constant)
        });
        let is_incomplete = hits.len() > max_items;

        let mut items: Vec<CompletionItem> = hits
            .into_iter()
            .take(max_items)
            .enumerate()
            .map(|(rank, h)| {
                let mut item = symbol_item(&h.symbol, rank);
                item.label = h.symbol.last_segment().to_string();
                item.detail = Some(h.symbol.name.clone());
                if h.symbol.kind.is_class_like() {
                    item.additional_text_edits = use_statement_edit(ctx, &h.symbol.name);
                }
                item
            })
            .collect();

        let lower = prefix.to_lowercase();
        for keyword in NAME_KEYWORDS {
            if keyword.starts_with(&lower) {
                items.push(keyword_item(keyword));
            }
        }
        list(items, is_incomplete)
    }
}

// --- Shared helpers ------------------------------------------------------

fn list(items: Vec<CompletionItem>, is_incomplete: bool) -> CompletionList {
    CompletionList {
        is_incomplete,
        items,
    }
}

fn truncate(mut items: Vec<CompletionItem>, max_items: usize) -> CompletionList {
    let is_incomplete = items.len() > max_items;
    items.truncate(max_items);
    list(items, is_incomplete)
}

/// The line prefix with the typed identifier fragment removed.
fn base_before_word<'a>(ctx: &'a CompletionContext) -> &'a str {
    let lp = ctx.line_prefix();
    &lp[..lp.len() - ctx.word_prefix().len()]
}

/// The line prefix with a member fragment (`bar`, `$bar`) removed.
fn base_before_member<'a>(ctx: &'a CompletionContext) -> &'a str {
    let lp = ctx.line_prefix();
    &lp[..lp.len() - member_prefix(ctx).len()]
}

/// The member fragment typed after `->` or `::`.
fn member_prefix<'a>(ctx: &'a CompletionContext) -> &'a str {
    let lp = ctx.line_prefix();
    let start = lp
        .rfind(|c: char| !c.is_alphanumeric() && c != '_' && c != '$')
        .map(|i| i + 1)
        .unwrap_or(0);
    &lp[start..]
}

/// True when `text` ends with `keyword` as a whole word.
fn ends_with_keyword(text: &str, keyword: &str) -> bool {
    let trimmed = text.trim_end();
    if trimmed == text {
        // A word needs a separator before the cursor fragment.
        return false;
    }
    if !trimmed.to_lowercase().ends_with(keyword) {
        return false;
    }
    let before = &trimmed[..trimmed.len() - keyword.len()];
    before
        .chars()
        .next_back()
        .map(|c| !c.is_alphanumeric() && c != '_')
        .unwrap_or(true)
}

fn in_class_body(ctx: &CompletionContext) -> bool {
    matches!(
        ctx.enclosing(&["declaration_list", "compound_statement"]),
        Some(node) if node.kind() == "declaration_list"
    )
}

/// Substitute `self`/`static`/`$this` with the enclosing class.
fn contextualize(ctx: &CompletionContext, ty: TypeString) -> TypeString {
    match ctx.enclosing_class_fqn() {
        Some(class) => ty.with_class_context(class),
        None => ty,
    }
}

/// Magic members (`__get`, `__call`, ...) sort after everything else.
fn rank_magic_last(rank: usize, member_name: &str) -> usize {
    if member_name.starts_with("__") {
        rank + 1000
    } else {
        rank
    }
}

/// Prefix match when a prefix was typed, a bounded browse otherwise.
fn prefix_or_browse(
    ctx: &CompletionContext,
    prefix: &str,
    max_items: usize,
    filter: impl Fn(&Symbol) -> bool + Copy,
) -> Vec<Symbol> {
    if prefix.is_empty() {
        browse(ctx, max_items, filter)
    } else {
        ctx.store
            .match_(prefix, filter)
            .into_iter()
            .map(|h| h.symbol)
            .take(max_items)
            .collect()
    }
}

/// Walk every table for matching symbols, up to a cap.
fn browse(
    ctx: &CompletionContext,
    max_items: usize,
    filter: impl Fn(&Symbol) -> bool,
) -> Vec<Symbol> {
    let mut out = Vec::new();
    for table in ctx.store.tables() {
        for symbol in table.iter() {
            if symbol.modifiers.is_anonymous || symbol.modifiers.is_import {
                continue;
            }
            if filter(symbol) {
                out.push(symbol.clone());
                if out.len() >= max_items {
                    return out;
                }
            }
        }
    }
    out
}

fn class_name_list(
    ctx: &CompletionContext,
    max_items: usize,
    filter: impl Fn(&Symbol) -> bool + Copy,
) -> CompletionList {
    let prefix = ctx.word_prefix();
    let hits = prefix_or_browse(ctx, prefix, max_items, filter);
    let is_incomplete = hits.len() >= max_items;
    let items = hits
        .iter()
        .enumerate()
        .map(|(rank, symbol)| {
            let mut item = symbol_item(symbol, rank);
            item.label = symbol.last_segment().to_string();
            item.detail = Some(symbol.name.clone());
            item.additional_text_edits = use_statement_edit(ctx, &symbol.name);
            item
        })
        .collect();
    list(items, is_incomplete)
}
