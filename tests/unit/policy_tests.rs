// Unit tests for policy schemas and evaluation through the public API

use pixvariant::imaging::{ImageMetadata, OutputFormat};
use pixvariant::policy::{compile, Policy, PolicyContext, PolicyDecision, PolicySchema, VariantSpec};

fn context(width: u32, height: u32, format: &str, bytes: u64) -> PolicyContext {
    PolicyContext::from_metadata(
        ImageMetadata::basic(width, height, format),
        bytes,
        format!("upload.{}", format),
        format!("image/{}", format),
    )
}

const SCHEMA_YAML: &str = r#"
name: web
rules:
  - name: huge
    condition:
      width: { gt: 2000 }
    result:
      variants:
        - { width: 2000, format: avif, quality: 60 }
        - { width: 1000, format: webp }
  - name: large
    condition:
      width: { gt: 800 }
    result:
      variants:
        - { width: 800, format: webp }
  - name: heavy-png
    condition:
      format: { in: [png] }
      bytes: { gt: 500000 }
    result:
      variants:
        - { width: 400, format: webp }
"#;

#[test]
fn test_wide_image_gets_single_webp_variant() {
    // Test: width=1200 matches only the second rule
    let schema = PolicySchema::from_yaml(
        r#"
rules:
  - condition: { width: { gt: 800 } }
    result:
      variants: [{ width: 800, format: webp }]
"#,
    )
    .unwrap();
    let policy = compile(schema);

    assert_eq!(
        policy.evaluate(&context(1200, 900, "jpeg", 1000)),
        PolicyDecision::new(vec![VariantSpec::new(800, OutputFormat::WebP)])
    );
    assert_eq!(
        policy.evaluate(&context(500, 400, "jpeg", 1000)),
        PolicyDecision::empty()
    );
}

#[test]
fn test_first_matching_rule_wins_over_later_overlaps() {
    // Test: width=3000 satisfies "huge" and "large"; "huge" is listed first
    let policy = compile(PolicySchema::from_yaml(SCHEMA_YAML).unwrap());
    let decision = policy.decide(&context(3000, 2000, "jpeg", 10));

    assert_eq!(
        decision.variants,
        vec![
            VariantSpec::new(2000, OutputFormat::Avif).with_quality(60),
            VariantSpec::new(1000, OutputFormat::WebP),
        ]
    );
    assert_eq!(policy.matching_rule(&context(3000, 2000, "jpeg", 10)), Some(0));
    assert_eq!(policy.matching_rule(&context(1500, 1000, "jpeg", 10)), Some(1));
}

#[test]
fn test_conjunction_of_format_and_bytes() {
    let policy = compile(PolicySchema::from_yaml(SCHEMA_YAML).unwrap());

    assert_eq!(policy.matching_rule(&context(600, 600, "png", 600_000)), Some(2));
    assert_eq!(policy.matching_rule(&context(600, 600, "png", 100)), None);
    assert_eq!(policy.matching_rule(&context(600, 600, "jpeg", 600_000)), None);
}

#[test]
fn test_json_and_yaml_schemas_are_equivalent() {
    let json = r#"{
        "name": "web",
        "rules": [
            {"condition": {"width": {"gt": 800}}, "result": {"variants": [{"width": 800, "format": "webp"}]}}
        ]
    }"#;
    let yaml = r#"
name: web
rules:
  - condition: { width: { gt: 800 } }
    result: { variants: [{ width: 800, format: webp }] }
"#;
    assert_eq!(
        PolicySchema::from_json(json).unwrap(),
        PolicySchema::from_yaml(yaml).unwrap()
    );
}

#[test]
fn test_unknown_condition_field_is_rejected() {
    let yaml = r#"
rules:
  - condition: { colour: { eq: red } }
    result: { variants: [] }
"#;
    assert!(PolicySchema::from_yaml(yaml).is_err());
}

#[test]
fn test_compiled_policy_and_closure_share_the_trait() {
    let compiled = compile(PolicySchema::from_yaml(SCHEMA_YAML).unwrap());
    let closure = |ctx: &PolicyContext| {
        PolicyDecision::new(vec![VariantSpec::new(ctx.width / 4, OutputFormat::Jpeg)])
    };
    let policies: Vec<&dyn Policy> = vec![&compiled, &closure];

    let ctx = context(1200, 800, "jpeg", 10);
    let decisions: Vec<PolicyDecision> = policies.iter().map(|p| p.decide(&ctx)).collect();

    assert_eq!(decisions[0].variants[0].width, 800);
    assert_eq!(decisions[1].variants[0].width, 300);
}

#[test]
fn test_decision_serializes_without_optional_fields() {
    let decision = PolicyDecision::new(vec![VariantSpec::new(800, OutputFormat::WebP)]);
    assert_eq!(
        serde_json::to_string(&decision).unwrap(),
        r#"{"variants":[{"width":800,"format":"webp"}]}"#
    );
}
