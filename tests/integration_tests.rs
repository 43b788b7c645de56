//! Integration tests for template loading and visibility propagation
//!
//! These tests drive a realistic questionnaire end to end through the
//! public API.

use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

use vsaq_rs::engine::condition::{evaluate_str, tokenize, Value as ConditionValue};
use vsaq_rs::engine::error::{ExpressionError, ParseError, QuestionnaireError};
use vsaq_rs::vsaq::questionnaire::{
    AnswerMap, DisplayMode, ItemTree, Questionnaire, QuestionnaireEvent, Session,
};
use vsaq_rs::vsaq::template::TemplateLoader;

// ============================================================================
// Fixtures
// ============================================================================

static TEMPLATE: Lazy<Value> = Lazy::new(|| {
    json!({
        "questionnaire": [
            {"type": "block", "id": "intro", "text": "General", "items": [
                {"type": "yesno", "id": "uses_crypto", "text": "Do you use cryptography?"},
                {"type": "line", "id": "crypto_lib", "cond": "uses_crypto/yes",
                 "text": "Which library?", "placeholder": "e.g. ring"}
            ]},
            {"type": "radiogroup", "id": "hosting", "defaultChoice": true,
             "choices": [{"hosting_cloud": "Cloud"}, {"hosting_onprem": "On premises"}]},
            {"type": "block", "id": "cloud_block", "cond": "hosting_cloud", "items": [
                {"type": "line", "id": "cloud_provider", "text": "Provider"},
                {"type": "tip", "id": "cloud_tip", "severity": "medium",
                 "cond": "matches(cloud_provider/value, \"^(aws|gcp)$\", \"i\")",
                 "warn": "yes", "clarification": "Describe your IAM setup"}
            ]},
            {"type": "info", "id": "provider_echo", "cond": "cloud_provider"},
            {"type": "info", "id": "cloud_notice", "cond": "^cloud_block"},
            {"type": "box", "id": "notes", "cond": "!hosting_onprem"},
            {"type": "check", "id": "reviewed", "auth": "admin"},
            {"type": "info", "id": "marker", "className": "vsaq-invisible"}
        ]
    })
});

fn load_tree() -> ItemTree {
    TemplateLoader::new()
        .parse_json(&TEMPLATE.to_string())
        .expect("fixture template")
}

fn questionnaire() -> Questionnaire {
    Questionnaire::from_tree(load_tree(), DisplayMode::default()).unwrap()
}

fn visible(q: &Questionnaire, id: &str) -> bool {
    q.is_visible(id).unwrap()
}

// ============================================================================
// Template Loading Tests
// ============================================================================

#[test]
fn test_load_json_template() {
    let tree = load_tree();
    // 12 declared items, two choices and the synthetic default choice
    assert_eq!(tree.len(), 15);
    assert!(tree.item("hosting_none").unwrap().is_synthetic());
    assert_eq!(
        tree.item("crypto_lib").unwrap().extra.get("placeholder"),
        Some(&json!("e.g. ring"))
    );
}

#[test]
fn test_yaml_template_matches_json() {
    let yaml = serde_yaml::to_string(&*TEMPLATE).unwrap();
    let tree = TemplateLoader::new().parse_yaml(&yaml).unwrap();
    let json_tree = load_tree();

    let ids = |t: &ItemTree| -> Vec<String> {
        t.document_order()
            .into_iter()
            .map(|i| t.get(i).id.clone())
            .collect()
    };
    assert_eq!(ids(&tree), ids(&json_tree));
}

#[test]
fn test_template_errors_are_fatal() {
    let result = TemplateLoader::new().parse_json(r#"[{"type": "line", "items": [{"type": "info"}]}]"#);
    assert!(matches!(
        result,
        Err(QuestionnaireError::Parse(ParseError::UnexpectedChildren { .. }))
    ));
}

#[test]
fn test_bundled_demo_template() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("templates/demo.json");
    let tree = TemplateLoader::new().load_template(path).unwrap();
    let mut q = Questionnaire::from_tree(tree, DisplayMode::default()).unwrap();
    assert!(!visible(&q, "pii_details"));
    assert!(!visible(&q, "review_notes"));

    q.answer("handles_pii", "yes").unwrap();
    q.answer("pii_protection_none", "checked").unwrap();
    assert!(visible(&q, "pii_unprotected_tip"));

    q.answer("auth_password", "checked").unwrap();
    assert!(visible(&q, "auth_mfa_tip"));
    q.answer("auth_mfa", "checked").unwrap();
    assert!(!visible(&q, "auth_mfa_tip"));
}

// ============================================================================
// Expression Tests
// ============================================================================

fn constants(reference: &str) -> Result<ConditionValue, ExpressionError> {
    match reference {
        "t" => Ok(ConditionValue::Bool(true)),
        "f" => Ok(ConditionValue::Bool(false)),
        other => Err(ExpressionError::reference(other, "unknown")),
    }
}

fn eval(expression: &str) -> Result<bool, ExpressionError> {
    let mut resolver = constants;
    evaluate_str(expression, &mut resolver).map(|v| v.is_truthy())
}

#[test]
fn test_expression_semantics() {
    assert_eq!(eval(""), Ok(true));
    assert_eq!(eval("t && f"), Ok(false));
    // no precedence: folded left to right as (t || t) && f
    assert_eq!(eval("t || t && f"), Ok(false));
    assert_eq!(eval("!(f || f)"), Ok(true));
    assert!(eval("missing").is_err());
}

#[test]
fn test_malformed_expressions() {
    assert!(matches!(tokenize("a&b"), Err(ExpressionError::Syntax { offset: 1, .. })));
    assert!(matches!(tokenize("(a&&b"), Err(ExpressionError::Syntax { offset: 0, .. })));
}

// ============================================================================
// Visibility Tests
// ============================================================================

#[test]
fn test_initial_visibility() {
    let q = questionnaire();
    assert_eq!(
        q.hidden_ids(),
        vec![
            "crypto_lib",
            "cloud_block",
            "cloud_provider",
            "cloud_tip",
            "provider_echo",
            "cloud_notice",
            "reviewed",
            "marker"
        ]
    );
    assert!(visible(&q, "notes"));
    assert_eq!(q.propagation_count(), 1);
}

#[test]
fn test_yes_no_reveals_follow_up() {
    let mut q = questionnaire();
    q.answer("uses_crypto", "yes").unwrap();
    assert!(visible(&q, "crypto_lib"));

    q.answer("uses_crypto", "no").unwrap();
    assert!(!visible(&q, "crypto_lib"));
}

#[test]
fn test_reference_into_hidden_container_is_false() {
    let mut q = questionnaire();
    q.answer("hosting_cloud", "checked").unwrap();
    q.answer("cloud_provider", "AWS").unwrap();
    assert!(visible(&q, "cloud_block"));
    assert!(visible(&q, "cloud_notice"));
    assert!(visible(&q, "provider_echo"));
    assert!(visible(&q, "cloud_tip"));

    // the provider keeps its text, but its container is gone
    q.answer("hosting_onprem", "checked").unwrap();
    assert_eq!(q.value("cloud_provider").unwrap(), "AWS");
    assert!(!visible(&q, "cloud_block"));
    assert!(!visible(&q, "provider_echo"));
    assert!(!visible(&q, "cloud_notice"));
}

#[test]
fn test_radio_negation() {
    let mut q = questionnaire();
    assert!(visible(&q, "notes"));
    q.answer("hosting_onprem", "checked").unwrap();
    assert!(!visible(&q, "notes"));
    q.answer("hosting_none", "checked").unwrap();
    assert!(visible(&q, "notes"));
    assert_eq!(q.value("hosting_onprem").unwrap(), "");
}

#[test]
fn test_admin_mode() {
    let q = Questionnaire::from_tree(
        load_tree(),
        DisplayMode {
            admin: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(visible(&q, "reviewed"));
    assert!(!visible(&q, "marker"));
}

#[test]
fn test_signals() {
    let mut q = questionnaire();
    let mut rx = q.subscribe();

    q.answer("hosting_cloud", "checked").unwrap();
    q.answer("hosting_onprem", "checked").unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    let changed: Vec<&QuestionnaireEvent> = events
        .iter()
        .filter(|e| matches!(e, QuestionnaireEvent::Changed { .. }))
        .collect();
    assert_eq!(
        changed[1],
        &QuestionnaireEvent::Changed {
            id: "hosting_onprem".into(),
            values: BTreeMap::from([
                ("hosting_cloud".to_string(), String::new()),
                ("hosting_onprem".to_string(), "checked".to_string()),
            ]),
        }
    );

    let shown = events
        .iter()
        .filter(|e| **e == QuestionnaireEvent::Shown { id: "cloud_block".into() })
        .count();
    let hidden = events
        .iter()
        .filter(|e| **e == QuestionnaireEvent::Hidden { id: "cloud_block".into() })
        .count();
    assert_eq!((shown, hidden), (1, 1));
}

// ============================================================================
// Import / Export Tests
// ============================================================================

#[test]
fn test_import_export_import_is_stable() {
    let mut q = questionnaire();
    q.answer("uses_crypto", "yes").unwrap();
    q.answer("crypto_lib", "ring").unwrap();
    q.answer("hosting_cloud", "checked").unwrap();
    q.answer("cloud_provider", "gcp").unwrap();
    let exported = q.values().clone();

    let mut first = questionnaire();
    first.set_values(&exported).unwrap();
    let mut second = questionnaire();
    second.set_values(first.values()).unwrap();

    assert_eq!(first.values(), &exported);
    assert_eq!(second.values(), first.values());
    assert_eq!(second.visible_ids(), q.visible_ids());
}

#[test]
fn test_import_skips_unknown_and_invalid() {
    let mut q = questionnaire();
    let answers = AnswerMap::from([
        ("ghost".to_string(), "boo".to_string()),
        ("uses_crypto".to_string(), "maybe".to_string()),
        ("notes".to_string(), "kept".to_string()),
    ]);
    q.set_values(&answers).unwrap();
    assert_eq!(
        q.values(),
        &AnswerMap::from([("notes".to_string(), "kept".to_string())])
    );
}

// ============================================================================
// Session Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_rapid_text_changes_run_one_pass() {
    let q = questionnaire();
    let mut session = Session::new(q, Duration::from_secs(1));
    session.answer("hosting_cloud", "checked").await.unwrap();

    let shared = session.questionnaire();
    let before = shared.lock().await.propagation_count();

    for text in ["g", "gc", "gcp"] {
        session.answer("cloud_provider", text).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    assert_eq!(shared.lock().await.propagation_count(), before);

    tokio::time::sleep(Duration::from_secs(1)).await;
    let q = shared.lock().await;
    assert_eq!(q.propagation_count(), before + 1);
    assert!(q.is_visible("cloud_tip").unwrap());
}
