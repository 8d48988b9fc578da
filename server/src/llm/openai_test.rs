use serde_json::json;

use super::*;

// =============================================================================
// Response parsing
// =============================================================================

#[test]
fn parses_text_response() {
    let body = json!({
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": "{\"annotations\":[]}" },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
    })
    .to_string();
    let resp = parse_chat_completions_response(&body).unwrap();
    assert_eq!(resp.text(), "{\"annotations\":[]}");
    assert_eq!(resp.stop_reason, "end_turn");
    assert_eq!((resp.input_tokens, resp.output_tokens), (10, 5));
}

#[test]
fn null_content_is_empty() {
    let body = json!({
        "model": "gpt-4o-mini",
        "choices": [{ "message": { "role": "assistant", "content": null }, "finish_reason": "stop" }]
    })
    .to_string();
    let resp = parse_chat_completions_response(&body).unwrap();
    assert!(resp.content.is_empty());
}

#[test]
fn length_finish_maps_to_max_tokens() {
    let body = json!({
        "choices": [{ "message": { "content": "{\"steps\":" }, "finish_reason": "length" }]
    })
    .to_string();
    assert_eq!(parse_chat_completions_response(&body).unwrap().stop_reason, "max_tokens");
}

#[test]
fn missing_choices_is_parse_error() {
    let body = json!({ "model": "gpt-4o-mini", "choices": [] }).to_string();
    assert!(matches!(parse_chat_completions_response(&body), Err(LlmError::ApiParse(_))));
}

#[test]
fn invalid_json_is_parse_error() {
    assert!(matches!(parse_chat_completions_response("not json"), Err(LlmError::ApiParse(_))));
}

// =============================================================================
// Request building
// =============================================================================

#[test]
fn system_prompt_leads_and_image_becomes_high_detail_url() {
    let msgs = build_chat_completions_messages(
        "Eres un tutor.",
        &[Message::user_with_image("Revisa esto", Some("data:image/png;base64,AAAA"))],
    );
    let v = serde_json::to_value(&msgs).unwrap();
    assert_eq!(v[0]["role"], "system");
    assert_eq!(v[0]["content"], "Eres un tutor.");
    assert_eq!(v[1]["content"][0], json!({ "type": "text", "text": "Revisa esto" }));
    assert_eq!(v[1]["content"][1]["type"], "image_url");
    assert_eq!(v[1]["content"][1]["image_url"]["url"], "data:image/png;base64,AAAA");
    assert_eq!(v[1]["content"][1]["image_url"]["detail"], "high");
}

#[test]
fn blank_system_prompt_is_omitted() {
    let msgs = build_chat_completions_messages("  ", &[Message::text("user", "hola")]);
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].role, "user");
}

#[test]
fn schema_becomes_strict_json_schema_format() {
    let schema = ResponseSchema { name: "math_analysis".into(), schema: json!({ "type": "object" }) };
    let msgs = build_chat_completions_messages("", &[Message::text("user", "hola")]);
    let body = CcRequest {
        model: "gpt-4o-mini",
        max_tokens: 100,
        messages: &msgs,
        response_format: Some(CcResponseFormat::from(&schema)),
    };
    let v = serde_json::to_value(&body).unwrap();
    assert_eq!(v["response_format"]["type"], "json_schema");
    assert_eq!(v["response_format"]["json_schema"]["name"], "math_analysis");
    assert_eq!(v["response_format"]["json_schema"]["strict"], true);
}

#[test]
fn no_schema_omits_response_format() {
    let msgs = build_chat_completions_messages("", &[Message::text("user", "hola")]);
    let body = CcRequest { model: "gpt-4o-mini", max_tokens: 100, messages: &msgs, response_format: None };
    let v = serde_json::to_value(&body).unwrap();
    assert!(v.get("response_format").is_none());
}
