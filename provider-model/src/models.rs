//! Model-Name Mapper (spec.md §4.3): a static bi-directional table per
//! provider translating a unified model alias to each provider's native
//! model name.

use crate::event::Provider;
use std::collections::HashMap;
use std::sync::OnceLock;

type ModelTable = HashMap<&'static str, &'static str>;

fn claude_table() -> &'static ModelTable {
    static TABLE: OnceLock<ModelTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            ("opus-4.1", "claude-opus-4-1-20250805"),
            ("sonnet-4", "claude-sonnet-4-20250514"),
            ("opus-4", "claude-opus-4-20250514"),
            ("haiku-3.5", "claude-3-5-haiku-20241022"),
            ("claude-sonnet-4", "claude-sonnet-4-20250514"),
            ("claude-opus-4.1", "claude-opus-4-1-20250805"),
            ("claude-opus-4", "claude-opus-4-20250514"),
            ("claude-haiku-3.5", "claude-3-5-haiku-20241022"),
            ("claude-opus-4-1-20250805", "claude-opus-4-1-20250805"),
            ("claude-sonnet-4-20250514", "claude-sonnet-4-20250514"),
            ("claude-opus-4-20250514", "claude-opus-4-20250514"),
            ("claude-3-5-haiku-20241022", "claude-3-5-haiku-20241022"),
        ])
    })
}

fn cursor_table() -> &'static ModelTable {
    static TABLE: OnceLock<ModelTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            ("gpt-5", "gpt-5"),
            ("sonnet-4", "sonnet-4"),
            ("opus-4.1", "opus-4.1"),
            ("sonnet-4-thinking", "sonnet-4-thinking"),
            ("claude-sonnet-4", "sonnet-4"),
            ("claude-opus-4.1", "opus-4.1"),
            ("claude-sonnet-4-20250514", "sonnet-4"),
            ("claude-opus-4-1-20250805", "opus-4.1"),
        ])
    })
}

fn codex_table() -> &'static ModelTable {
    static TABLE: OnceLock<ModelTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            ("gpt-5", "gpt-5"),
            ("gpt-4o", "gpt-4o"),
            ("gpt-4o-mini", "gpt-4o-mini"),
            ("o1-preview", "o1-preview"),
            ("o1-mini", "o1-mini"),
            ("claude-3.5-sonnet", "claude-3.5-sonnet"),
            ("claude-3-haiku", "claude-3-haiku"),
            ("sonnet-4", "claude-3.5-sonnet"),
            ("claude-sonnet-4", "claude-3.5-sonnet"),
            ("haiku-3.5", "claude-3-haiku"),
            ("claude-haiku-3.5", "claude-3-haiku"),
        ])
    })
}

fn qwen_table() -> &'static ModelTable {
    static TABLE: OnceLock<ModelTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            ("qwen3-coder-plus", "qwen-coder"),
            ("Qwen3 Coder Plus", "qwen-coder"),
            ("qwen-coder", "qwen-coder"),
        ])
    })
}

fn gemini_table() -> &'static ModelTable {
    static TABLE: OnceLock<ModelTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            ("gemini-2.5-pro", "gemini-2.5-pro"),
            ("gemini-2.5-flash", "gemini-2.5-flash"),
        ])
    })
}

fn table_for(provider: Provider) -> &'static ModelTable {
    match provider {
        Provider::Claude => claude_table(),
        Provider::Cursor => cursor_table(),
        Provider::Codex => codex_table(),
        Provider::Qwen => qwen_table(),
        Provider::Gemini => gemini_table(),
    }
}

/// Translates a unified model alias to `provider`'s native model name.
///
/// Passes through unchanged (with a `tracing::warn!`) if `alias` is neither
/// a known unified alias nor an already-native provider name.
#[must_use]
pub fn resolve_model(provider: Provider, alias: &str) -> String {
    let table = table_for(provider);

    if let Some(native) = table.get(alias) {
        return (*native).to_string();
    }
    if table.values().any(|v| *v == alias) {
        return alias.to_string();
    }

    tracing::warn!(
        provider = provider.as_str(),
        alias,
        "model alias not found in mapping table, passing through unchanged"
    );
    alias.to_string()
}

/// All aliases (unified and native) accepted for `provider`.
#[must_use]
pub fn supported_models(provider: Provider) -> Vec<String> {
    let table = table_for(provider);
    let mut names: Vec<String> = table.keys().map(|k| (*k).to_string()).collect();
    names.extend(table.values().map(|v| (*v).to_string()));
    names.sort();
    names.dedup();
    names
}

/// True if `name` is a recognized alias (unified or native) for `provider`.
#[must_use]
pub fn is_model_supported(provider: Provider, name: &str) -> bool {
    let table = table_for(provider);
    table.contains_key(name) || table.values().any(|v| *v == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_unified_alias() {
        assert_eq!(
            resolve_model(Provider::Claude, "sonnet-4"),
            "claude-sonnet-4-20250514"
        );
        assert_eq!(resolve_model(Provider::Codex, "sonnet-4"), "claude-3.5-sonnet");
    }

    #[test]
    fn passes_through_native_name() {
        assert_eq!(
            resolve_model(Provider::Cursor, "sonnet-4-thinking"),
            "sonnet-4-thinking"
        );
    }

    #[test]
    fn passes_through_unknown_name() {
        assert_eq!(resolve_model(Provider::Gemini, "made-up-model"), "made-up-model");
    }

    #[test]
    fn resolve_is_a_right_identity_on_native_names() {
        // spec.md §8 property 5: Resolve(p, Resolve(p, m)) == Resolve(p, m)
        for (provider, alias) in [
            (Provider::Claude, "sonnet-4"),
            (Provider::Cursor, "claude-sonnet-4"),
            (Provider::Codex, "haiku-3.5"),
            (Provider::Qwen, "qwen3-coder-plus"),
            (Provider::Gemini, "gemini-2.5-pro"),
        ] {
            let once = resolve_model(provider, alias);
            let twice = resolve_model(provider, &once);
            assert_eq!(once, twice);
        }
    }
}
