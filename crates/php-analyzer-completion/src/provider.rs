//! Strategy dispatch.

use crate::context::CompletionContext;
use crate::strategies::{default_strategies, CompletionStrategy};
use lsp_types::CompletionList;
use php_analyzer_types::cancel::{cancelled, CancellationToken};

pub struct CompletionProvider {
    pub max_items: usize,
    strategies: Vec<Box<dyn CompletionStrategy>>,
}

impl Default for CompletionProvider {
    fn default() -> Self {
        CompletionProvider::new(100)
    }
}

impl CompletionProvider {
    pub fn new(max_items: usize) -> Self {
        CompletionProvider {
            max_items,
            strategies: default_strategies(),
        }
    }

    /// Consult the strategies in priority order; the first that matches
    /// the cursor answers. Cancellation yields the empty list.
    pub fn provide(
        &self,
        ctx: &CompletionContext,
        cancel: Option<&CancellationToken>,
    ) -> CompletionList {
        for (index, strategy) in self.strategies.iter().enumerate() {
            if cancelled(cancel) {
                return CompletionList::default();
            }
            if strategy.can_suggest(ctx) {
                let result = strategy.completions(ctx, self.max_items);
                tracing::debug!(
                    strategy = index,
                    items = result.items.len(),
                    incomplete = result.is_incomplete,
                    "completion strategy answered"
                );
                return result;
            }
        }
        CompletionList::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::CompletionItemKind;
    use php_analyzer_index::SymbolStore;
    use php_analyzer_parser::{Document, SymbolReader};
    use php_analyzer_typing::ReferenceReader;
    use php_analyzer_types::Position;

    const LIB: &str = "<?php\nnamespace A\\B;\nclass Foo {\n    public int $count = 0;\n    public static string $label = '';\n    public const LIMIT = 5;\n    public function bar(): int { return 1; }\n    public function __call($name, $args) {}\n    protected function hook() {}\n    private function secret() {}\n}\ninterface Greets {}\ntrait Aids {}\nclass FooBar extends Foo {}\nfunction helper(): int { return 0; }\n";

    struct Fixture {
        store: SymbolStore,
        doc: Document,
        refs: php_analyzer_types::ReferenceTable,
    }

    fn fixture(code: &str) -> Fixture {
        let store = SymbolStore::new();
        let lib = Document::new("file:///lib.php", LIB, 1);
        store.add(SymbolReader::read(lib.tree().unwrap(), LIB, "file:///lib.php"));

        let doc = Document::new("file:///main.php", code, 1);
        let table = SymbolReader::read(doc.tree().unwrap(), code, "file:///main.php");
        store.add(table);
        let table = store.table("file:///main.php").unwrap();
        let refs = ReferenceReader::read(
            &store,
            &table,
            doc.tree().unwrap(),
            code,
            "file:///main.php",
            None,
        )
        .unwrap();
        Fixture { store, doc, refs }
    }

    fn complete_at(fixture: &Fixture, code: &str, position: Position) -> CompletionList {
        let table = fixture.store.table("file:///main.php").unwrap();
        let ctx = CompletionContext::new(
            &fixture.store,
            &table,
            Some(&fixture.refs),
            fixture.doc.tree().unwrap(),
            code,
            position,
        );
        CompletionProvider::default().provide(&ctx, None)
    }

    fn pos_after(code: &str, needle: &str) -> Position {
        for (line, row) in code.lines().enumerate() {
            if let Some(col) = row.find(needle) {
                return Position::new(line as u32, (col + needle.len()) as u32);
            }
        }
        panic!("needle not found: {}", needle);
    }

    #[test]
    fn test_object_access_members() {
        let code = "<?php\nnamespace N;\nuse A\\B\\Foo;\nfunction f(Foo $x) {\n    $x->\n}\n";
        let fixture = fixture(code);
        let result = complete_at(&fixture, code, pos_after(code, "$x->"));
        let labels: Vec<&str> = result.items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"bar"));
        assert!(labels.contains(&"count"));
        // Statics and invisibles stay out of `->`.
        assert!(!labels.contains(&"$label"));
        assert!(!labels.contains(&"hook"));
        assert!(!labels.contains(&"secret"));
    }

    #[test]
    fn test_object_access_prefix_filters_and_ranks_before_magic() {
        let code = "<?php\nnamespace N;\nuse A\\B\\Foo;\nfunction f(Foo $x) {\n    $x->b\n}\n";
        let fixture = fixture(code);
        let result = complete_at(&fixture, code, pos_after(code, "$x->b"));
        let labels: Vec<&str> = result.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["bar"]);
        assert_eq!(result.items[0].kind, Some(CompletionItemKind::METHOD));
    }

    #[test]
    fn test_magic_methods_sort_after_declared() {
        let code = "<?php\nnamespace N;\nuse A\\B\\Foo;\nfunction f(Foo $x) {\n    $x->\n}\n";
        let fixture = fixture(code);
        let result = complete_at(&fixture, code, pos_after(code, "$x->"));
        let bar = result.items.iter().find(|i| i.label == "bar").unwrap();
        let magic = result.items.iter().find(|i| i.label == "__call").unwrap();
        assert!(bar.sort_text < magic.sort_text);
    }

    #[test]
    fn test_scoped_access_members() {
        let code = "<?php\nnamespace N;\nuse A\\B\\Foo;\nFoo::\n";
        let fixture = fixture(code);
        let result = complete_at(&fixture, code, pos_after(code, "Foo::"));
        let labels: Vec<&str> = result.items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"LIMIT"));
        assert!(labels.contains(&"$label"));
        assert!(labels.contains(&"bar"));
        assert!(!labels.contains(&"count"));
    }

    #[test]
    fn test_class_type_designator_after_new() {
        let code = "<?php\nnamespace N;\n$x = new Fo\n";
        let fixture = fixture(code);
        let result = complete_at(&fixture, code, pos_after(code, "new Fo"));
        let labels: Vec<&str> = result.items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"Foo"));
        assert!(labels.contains(&"FooBar"));
        // Out-of-namespace classes come with an import edit.
        let foo = result.items.iter().find(|i| i.label == "Foo").unwrap();
        let edits = foo.additional_text_edits.as_ref().expect("use edit");
        assert!(edits[0].new_text.contains("use A\\B\\Foo;"));
    }

    #[test]
    fn test_variable_completion() {
        let code = "<?php\nfunction f(int $count, string $city) {\n    $c\n}\n";
        let fixture = fixture(code);
        let result = complete_at(&fixture, code, pos_after(code, "$c"));
        let labels: Vec<&str> = result.items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"$count"));
        assert!(labels.contains(&"$city"));
    }

    #[test]
    fn test_base_clause_offers_classes() {
        let code = "<?php\nnamespace N;\nclass Mine extends \n";
        let fixture = fixture(code);
        let result = complete_at(&fixture, code, pos_after(code, "extends "));
        assert!(result
            .items
            .iter()
            .all(|i| i.kind == Some(CompletionItemKind::CLASS)));
        assert!(!result.items.is_empty());
    }

    #[test]
    fn test_implements_offers_interfaces_only() {
        let code = "<?php\nnamespace N;\nclass Mine implements \n";
        let fixture = fixture(code);
        let result = complete_at(&fixture, code, pos_after(code, "implements "));
        let labels: Vec<&str> = result.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["Greets"]);
    }

    #[test]
    fn test_use_statement_completion() {
        let code = "<?php\nnamespace N;\nuse A\\B\\Fo\n";
        let fixture = fixture(code);
        let result = complete_at(&fixture, code, pos_after(code, "use A\\B\\Fo"));
        let inserts: Vec<&str> = result
            .items
            .iter()
            .filter_map(|i| i.insert_text.as_deref())
            .collect();
        assert!(inserts.contains(&"A\\B\\Foo"));
        assert!(inserts.contains(&"A\\B\\FooBar"));
    }

    #[test]
    fn test_method_declaration_header_offers_overrides() {
        let code = "<?php\nnamespace N;\nuse A\\B\\Foo;\nclass Mine extends Foo {\n    public function \n}\n";
        let fixture = fixture(code);
        let result = complete_at(&fixture, code, pos_after(code, "public function "));
        let labels: Vec<&str> = result.items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"bar"), "inherited override, got {:?}", labels);
        assert!(labels.contains(&"hook"));
        assert!(!labels.contains(&"secret"));
    }

    #[test]
    fn test_declaration_body_keywords() {
        let code = "<?php\nnamespace N;\nclass Mine {\n    pub\n}\n";
        let fixture = fixture(code);
        let result = complete_at(&fixture, code, pos_after(code, "    pub"));
        let labels: Vec<&str> = result.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["public"]);
    }

    #[test]
    fn test_name_completion_catch_all() {
        let code = "<?php\nnamespace N;\nhelp\n";
        let fixture = fixture(code);
        let result = complete_at(&fixture, code, pos_after(code, "help"));
        let labels: Vec<&str> = result.items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"helper"));
    }

    #[test]
    fn test_boundary_prefers_preceding_token() {
        // Cursor exactly at the `->` boundary completes members, not names.
        let code = "<?php\nnamespace N;\nuse A\\B\\Foo;\nfunction f(Foo $x) {\n    $x->bar\n}\n";
        let fixture = fixture(code);
        let result = complete_at(&fixture, code, pos_after(code, "$x->bar"));
        assert!(result.items.iter().any(|i| i.label == "bar"));
        assert_eq!(
            result.items[0].kind,
            Some(CompletionItemKind::METHOD),
            "member strategy answers at the boundary"
        );
    }

    #[test]
    fn test_no_context_yields_empty() {
        let code = "<?php\n\n";
        let fixture = fixture(code);
        let result = complete_at(&fixture, code, Position::new(1, 0));
        assert!(result.items.is_empty());
        assert!(!result.is_incomplete);
    }

    #[test]
    fn test_cancelled_query_is_empty() {
        let code = "<?php\nnamespace N;\nhelp\n";
        let fixture = fixture(code);
        let table = fixture.store.table("file:///main.php").unwrap();
        let ctx = CompletionContext::new(
            &fixture.store,
            &table,
            Some(&fixture.refs),
            fixture.doc.tree().unwrap(),
            code,
            pos_after(code, "help"),
        );
        let token = php_analyzer_types::CancellationToken::new();
        token.cancel();
        let result = CompletionProvider::default().provide(&ctx, Some(&token));
        assert!(result.items.is_empty());
    }
}
