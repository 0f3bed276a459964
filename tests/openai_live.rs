use std::env;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use dotenvy::dotenv;
use kaiwa_llm::LLMProvider;
use kaiwa_llm::http::reqwest::ReqwestTransport;
use kaiwa_llm::provider::openai::OpenAiProvider;
use kaiwa_llm::types::{ChatOptions, ImageParams};

#[tokio::test]
#[ignore = "requires valid OpenAI API key"]
async fn openai_live_chat_round_trip() {
    dotenv().ok();
    let Some(provider) = build_provider_from_env() else {
        return;
    };

    let options = ChatOptions {
        system: Some("你是一个有帮助的助手。".to_string()),
        temperature: Some(0.2),
        ..ChatOptions::default()
    };
    let response = provider
        .chat("请用一句话介绍 Rust 语言。", options)
        .await
        .expect("基础文本对话请求应成功");

    assert!(!response.content.is_empty(), "助手应返回非空内容");
    assert!(response.token_usage.has_data(), "线上响应应回报 token 用量");
    assert!(response.latency_ms.is_some(), "同步调用应记录延迟");
}

#[tokio::test]
#[ignore = "requires valid OpenAI API key"]
async fn openai_live_probes_report_availability() {
    dotenv().ok();
    let Some(provider) = build_provider_from_env() else {
        return;
    };

    assert!(provider.is_available().await, "有效凭证下探活应可达");

    let models = provider.list_models().await;
    assert!(!models.is_empty(), "模型列表不应为空");
}

#[tokio::test]
#[ignore = "requires valid OpenAI API key"]
async fn openai_live_image_generation_returns_base64() {
    dotenv().ok();
    let Some(provider) = build_provider_from_env() else {
        return;
    };

    let params = ImageParams {
        response_format: Some("b64_json".to_string()),
        size: Some("1024x1024".to_string()),
        ..ImageParams::new("A minimalist ink painting of a fox")
    };
    let response = provider
        .generate_image(params)
        .await
        .expect("图像生成请求应成功");

    let encoded = response.base64.expect("b64_json 格式应返回 base64 数据");
    let bytes = general_purpose::STANDARD
        .decode(encoded)
        .expect("base64 数据应可解码");
    assert!(!bytes.is_empty(), "解码后的图像不应为空");
}

fn build_provider_from_env() -> Option<OpenAiProvider> {
    let Some(api_key) = load_env_var("OPENAI_API_KEY") else {
        eprintln!("skip live test: OPENAI_API_KEY missing");
        return None;
    };

    let transport = Arc::new(ReqwestTransport::default_client().expect("reqwest client"));
    let mut provider = OpenAiProvider::new(transport, api_key);
    if let Some(base_url) = load_env_var("OPENAI_BASE_URL") {
        provider = provider.with_base_url(base_url);
    }
    if let Some(model) = load_env_var("OPENAI_CHAT_MODEL") {
        provider = provider.with_chat_model(model);
    }
    if let Some(model) = load_env_var("OPENAI_IMAGE_MODEL") {
        provider = provider.with_image_model(model);
    }
    Some(provider)
}

fn load_env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
