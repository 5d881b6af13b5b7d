//! Substitution rules and ordered rule groups.
//!
//! A [`Rule`] is an inert triple of identifier, regex source and replacement
//! template. Nothing is compiled at construction time; compilation happens
//! lazily in the engine through [`crate::cache`], so a malformed pattern only
//! costs the rule that carries it.

use std::collections::HashMap;
use thiserror::Error;

/// Bytes that may not sit directly before an assignment statement.
///
/// Rejects the tail of `==`, `!=`, `<=` and `>=`.
pub const COMPARISON_BYTES: &[u8] = b"=!<>";

/// A single named regex substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    id: String,
    pattern: String,
    replacement: String,
    rejected_before: &'static [u8],
}

impl Rule {
    /// Create a rule from a raw pattern and a replacement template.
    ///
    /// The template uses `regex` syntax for back-references (`${1}`,
    /// `${name}`).
    pub fn new(
        id: impl Into<String>,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            replacement: replacement.into(),
            rejected_before: &[],
        }
    }

    /// Drop matches whose preceding byte is one of `bytes`.
    ///
    /// Stands in for a negative look-behind, which the `regex` crate lacks.
    /// The check does not consume input, so adjacent statements still match.
    pub fn not_preceded_by(mut self, bytes: &'static [u8]) -> Self {
        self.rejected_before = bytes;
        self
    }

    /// Rule forcing `target = <expr>;` to `target = value;`.
    ///
    /// `target` is matched literally. The statement must not be preceded by
    /// `=`, `!`, `<` or `>` and the expression must not start with `=`, so
    /// comparisons such as `a == b` or `a != b` are left alone.
    pub fn assignment(id: impl Into<String>, target: &str, value: &str) -> Self {
        let pattern = format!(r"(?P<lhs>\b{}\s*=\s*)[^=;][^;]*;", regex::escape(target));
        let replacement = format!("${{lhs}}{value};");
        Self::new(id, pattern, replacement).not_preceded_by(COMPARISON_BYTES)
    }

    /// Rule forcing `#define MACRO <integer>` to `#define MACRO value`.
    pub fn define(id: impl Into<String>, macro_name: &str, value: u32) -> Self {
        let pattern = format!(r"#define\s+{}\s+\d+\b", regex::escape(macro_name));
        let replacement = format!("#define {macro_name} {value}");
        Self::new(id, pattern, replacement)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Whether a match starting right after `byte` must be dropped.
    pub fn rejects_after(&self, byte: u8) -> bool {
        self.rejected_before.contains(&byte)
    }
}

/// An ordered list of rules for one capability category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleGroup {
    category: &'static str,
    rules: Vec<Rule>,
}

impl RuleGroup {
    pub fn new(category: &'static str, rules: Vec<Rule>) -> Self {
        Self { category, rules }
    }

    pub fn category(&self) -> &'static str {
        self.category
    }

    /// Rules in application order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("rule id `{id}` is used by both `{first}` and `{second}`")]
pub struct DuplicateRuleId {
    pub id: String,
    pub first: &'static str,
    pub second: &'static str,
}

/// Check that no rule id appears twice across `groups`.
///
/// Change records are keyed by rule id, so a collision would make a report
/// ambiguous.
pub fn ensure_unique_ids<'a, I>(groups: I) -> Result<(), DuplicateRuleId>
where
    I: IntoIterator<Item = &'a RuleGroup>,
{
    let mut seen: HashMap<&str, &'static str> = HashMap::new();

    for group in groups {
        for rule in group.rules() {
            if let Some(first) = seen.insert(rule.id(), group.category()) {
                return Err(DuplicateRuleId {
                    id: rule.id().to_string(),
                    first,
                    second: group.category(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine;

    fn rewrite(rule: &Rule, text: &str) -> String {
        let groups = [RuleGroup::new("test", vec![rule.clone()])];
        let out = engine::rewrite(text.as_bytes(), &groups);
        assert!(out.errors.is_empty());
        String::from_utf8(out.content).unwrap()
    }

    #[test]
    fn test_assignment_rewrites_value() {
        let rule = Rule::assignment("sm69", "data->HighestShaderModel", "D3D_SHADER_MODEL_6_9");
        let out = rewrite(&rule, "    data->HighestShaderModel = D3D_SHADER_MODEL_6_5;\n");
        assert_eq!(out, "    data->HighestShaderModel = D3D_SHADER_MODEL_6_9;\n");
    }

    #[test]
    fn test_assignment_at_start_of_text() {
        let rule = Rule::assignment("wv1", "options1.WaveLaneCountMin", "32");
        let out = rewrite(&rule, "options1.WaveLaneCountMin = 4;");
        assert_eq!(out, "options1.WaveLaneCountMin = 32;");
    }

    #[test]
    fn test_assignment_ignores_comparisons() {
        let rule = Rule::assignment("wv0", "options1.WaveOps", "TRUE");
        let text = "if (options1.WaveOps == FALSE) return;\nx = y != options1.WaveOps;\n";
        assert_eq!(rewrite(&rule, text), text);
    }

    #[test]
    fn test_assignment_guard_is_not_consumed() {
        let rule = Rule::assignment("wv0", "options1.WaveOps", "TRUE");
        assert_eq!(
            rewrite(&rule, "options1.WaveOps=FALSE;options1.WaveOps=FALSE;"),
            "options1.WaveOps=TRUE;options1.WaveOps=TRUE;"
        );
    }

    #[test]
    fn test_assignment_rejects_comparison_tail() {
        let rule = Rule::assignment("wv0", "options1.WaveOps", "TRUE");
        assert!(rule.rejects_after(b'='));
        assert!(rule.rejects_after(b'>'));
        assert!(!rule.rejects_after(b';'));
        assert!(!Rule::define("pf0", "VKD3D_DEBUG", 0).rejects_after(b'='));
    }

    #[test]
    fn test_assignment_target_is_literal() {
        // `.` must not act as a wildcard.
        let rule = Rule::assignment("so1", "options1.Int64ShaderOps", "TRUE");
        let text = "options1xInt64ShaderOps = FALSE;";
        assert_eq!(rewrite(&rule, text), text);
    }

    #[test]
    fn test_assignment_requires_word_boundary() {
        let rule = Rule::assignment("sm69i", "info.HighestShaderModel", "D3D_SHADER_MODEL_6_9");
        let text = "adapter_info.HighestShaderModel = D3D_SHADER_MODEL_6_0;";
        assert_eq!(rewrite(&rule, text), text);
    }

    #[test]
    fn test_define_rewrites_integer() {
        let rule = Rule::define("pf0", "VKD3D_DEBUG", 0);
        assert_eq!(rewrite(&rule, "#define VKD3D_DEBUG 1\n"), "#define VKD3D_DEBUG 0\n");
    }

    #[test]
    fn test_define_does_not_match_longer_name() {
        let rule = Rule::define("cp0", "VKD3D_ENABLE_AVX", 1);
        let text = "#define VKD3D_ENABLE_AVX2 0\n";
        assert_eq!(rewrite(&rule, text), text);
    }

    #[test]
    fn test_construction_does_not_compile() {
        let rule = Rule::new("bad", "(unclosed", "x");
        assert_eq!(rule.pattern(), "(unclosed");
    }

    #[test]
    fn test_unique_ids_detects_collision() {
        let a = RuleGroup::new("a", vec![Rule::new("r0", "x", "y")]);
        let b = RuleGroup::new("b", vec![Rule::new("r1", "x", "y"), Rule::new("r0", "z", "w")]);

        let err = ensure_unique_ids([&a, &b]).unwrap_err();
        assert_eq!(err.id, "r0");
        assert_eq!(err.first, "a");
        assert_eq!(err.second, "b");
    }

    #[test]
    fn test_unique_ids_ok() {
        let a = RuleGroup::new("a", vec![Rule::new("r0", "x", "y")]);
        let b = RuleGroup::new("b", vec![Rule::new("r1", "x", "y")]);
        assert!(ensure_unique_ids([&a, &b]).is_ok());
    }
}
