//! Content-based source language detection.
//!
//! Each language scores 2 per matching pattern plus 1 per keyword
//! occurrence. The highest score wins, later languages winning ties, and C
//! is assumed when nothing matches.

use std::sync::LazyLock;

use regex_lite::Regex;

/// Language assumed when no rule matches.
pub const FALLBACK_LANGUAGE: &str = "c";

struct LanguageRules {
    name: &'static str,
    patterns: &'static [&'static str],
    keywords: &'static [&'static str],
}

const RULES: [LanguageRules; 6] = [
    LanguageRules {
        name: "c",
        patterns: &[
            r"#include\s*<.*\.h>",
            r"int\s+main\s*\(",
            r"printf\s*\(",
            r"scanf\s*\(",
            r"\bmalloc\s*\(",
            r"\bfree\s*\(",
        ],
        keywords: &["int", "char", "float", "double", "void", "struct", "union", "enum"],
    },
    LanguageRules {
        name: "cpp",
        patterns: &[
            r"#include\s*<iostream>",
            r"std::",
            r"cout\s*<<",
            r"cin\s*>>",
            r"namespace\s+std",
            r"class\s+\w+",
        ],
        keywords: &["class", "public", "private", "protected", "template", "namespace"],
    },
    LanguageRules {
        name: "java",
        patterns: &[
            r"public\s+class\s+\w+",
            r"public\s+static\s+void\s+main",
            r"System\.out\.",
            r"import\s+java\.",
            r"\bnew\s+\w+\s*\(",
        ],
        keywords: &["public", "private", "protected", "static", "final", "abstract"],
    },
    LanguageRules {
        name: "python",
        patterns: &[
            r"def\s+\w+\s*\(",
            r"import\s+\w+",
            r"from\s+\w+\s+import",
            r"print\s*\(",
            r#"if\s+__name__\s*==\s*["']__main__["']"#,
        ],
        keywords: &["def", "class", "import", "from", "if", "elif", "else", "for", "while"],
    },
    LanguageRules {
        name: "javascript",
        patterns: &[
            r"\b(const|let|var)\s+\w+",
            r"function\s+\w+\s*\(",
            r"=>\s*\{",
            r"console\.log\s*\(",
            r"require\s*\(",
        ],
        keywords: &["const", "let", "var", "function", "class", "import", "export"],
    },
    LanguageRules {
        name: "typescript",
        patterns: &[
            r"\b(interface|type)\s+\w+",
            r":\s*(string|number|boolean)",
            r"\bnamespace\s+\w+",
            r"\bas\s+\w+",
        ],
        keywords: &["interface", "type", "namespace", "enum", "readonly", "keyof"],
    },
];

struct CompiledRules {
    name: &'static str,
    patterns: Vec<Regex>,
    keywords: Vec<Regex>,
}

static COMPILED: LazyLock<Vec<CompiledRules>> =
    LazyLock::new(|| RULES.iter().map(compile).collect());

fn compile(rules: &LanguageRules) -> CompiledRules {
    let build = |source: String| match Regex::new(&source) {
        Ok(regex) => Some(regex),
        Err(err) => {
            log::warn!("skipping language rule {source}: {err}");
            None
        }
    };
    CompiledRules {
        name: rules.name,
        patterns: rules
            .patterns
            .iter()
            .filter_map(|pattern| build(pattern.to_string()))
            .collect(),
        keywords: rules
            .keywords
            .iter()
            .filter_map(|keyword| build(format!(r"\b{keyword}\b")))
            .collect(),
    }
}

/// Score every known language against `code`, in rule order.
pub fn language_scores(code: &str) -> Vec<(&'static str, usize)> {
    COMPILED
        .iter()
        .map(|rules| {
            let patterns = rules.patterns.iter().filter(|re| re.is_match(code)).count();
            let keywords: usize = rules
                .keywords
                .iter()
                .map(|re| re.find_iter(code).count())
                .sum();
            (rules.name, patterns * 2 + keywords)
        })
        .collect()
}

/// Best-scoring language for `code`, or [`FALLBACK_LANGUAGE`].
pub fn detect_language(code: &str) -> &'static str {
    let mut best: Option<(&'static str, usize)> = None;
    for (name, score) in language_scores(code) {
        match best {
            Some((_, top)) if top > score => {}
            _ => best = Some((name, score)),
        }
    }
    match best {
        Some((name, score)) if score > 0 => name,
        _ => FALLBACK_LANGUAGE,
    }
}
