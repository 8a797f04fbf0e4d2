//! First-match rule evaluation

use super::schema::{Condition, PolicySchema};
use super::{Policy, PolicyContext, PolicyDecision};

/// A compiled schema: rules are frozen, evaluation is a pure function
#[derive(Debug, Clone)]
pub struct CompiledPolicy {
    schema: PolicySchema,
}

/// Compile a schema into an evaluator
pub fn compile(schema: PolicySchema) -> CompiledPolicy {
    CompiledPolicy { schema }
}

impl CompiledPolicy {
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// Return the result of the first rule whose condition holds,
    /// or the empty decision when none does
    pub fn evaluate(&self, ctx: &PolicyContext) -> PolicyDecision {
        self.matching_rule(ctx)
            .map(|index| self.schema.rules[index].result.clone())
            .unwrap_or_default()
    }

    /// Index of the rule that would win for `ctx`
    pub fn matching_rule(&self, ctx: &PolicyContext) -> Option<usize> {
        self.schema
            .rules
            .iter()
            .position(|rule| condition_holds(rule.condition.as_ref(), ctx))
    }
}

impl Policy for CompiledPolicy {
    fn decide(&self, ctx: &PolicyContext) -> PolicyDecision {
        let rule = self.matching_rule(ctx);
        let decision = rule
            .map(|index| self.schema.rules[index].result.clone())
            .unwrap_or_default();
        tracing::debug!(
            policy = %self.schema.name,
            rule = ?rule,
            variants = decision.variants.len(),
            "Policy evaluated"
        );
        decision
    }
}

fn condition_holds(condition: Option<&Condition>, ctx: &PolicyContext) -> bool {
    let Some(condition) = condition else {
        return true;
    };

    if let Some(width) = &condition.width {
        if !width.matches(u64::from(ctx.width)) {
            return false;
        }
    }
    if let Some(height) = &condition.height {
        if !height.matches(u64::from(ctx.height)) {
            return false;
        }
    }
    if let Some(format) = &condition.format {
        if !format.matches(&ctx.format) {
            return false;
        }
    }
    if let Some(bytes) = &condition.bytes {
        if !bytes.matches(ctx.bytes) {
            return false;
        }
    }
    if let Some(content_type) = &condition.content_type {
        if !content_type.matches(&ctx.content_type) {
            return false;
        }
    }
    true
}
