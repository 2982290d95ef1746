//! Integration tests for configuration loading: TOML file parsing and
//! environment-variable overrides.

use notifyhub::NotifyConfig;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config file");
    file.write_all(contents.as_bytes())
        .expect("write temp config file");
    file
}

#[test]
fn loads_a_full_configuration_file() {
    let file = write_config(
        r#"
channels = ["email", "sms", "lark"]

[email]
smtp_server = "smtp.example.com"
smtp_port = 587
from = "alerts@example.com"
username = "alerts@example.com"
password = "app-password"

[sms]
host = "dysmsapi.aliyuncs.com"
access_key_id = "LTAI_test"
access_key_secret = "secret"
sign_name = "example"
template_code = "SMS_153055065"

[lark]
webhook_url = "https://open.feishu.cn/open-apis/bot/v2/hook/abc"
secret = "larksecret"

[wecom]
corp_id = "ww123"
agent_id = 1000002
secret = "wecom-secret"
msg_type = "markdown"

[webhook]
url = "https://hooks.example.com/notify"

[slack]
webhook_url = "https://hooks.slack.com/services/T0/B0/xyz"
"#,
    );

    let config = NotifyConfig::load(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config.channels, vec!["email", "sms", "lark"]);

    let email = config.email.unwrap();
    assert_eq!(email.smtp_server, "smtp.example.com");
    assert_eq!(email.smtp_port, 587);
    assert!(!email.tls);

    let sms = config.sms.unwrap();
    assert_eq!(sms.template_code, "SMS_153055065");

    let lark = config.lark.unwrap();
    assert_eq!(lark.secret, "larksecret");
    assert_eq!(lark.msg_type, "text");

    let wecom = config.wecom.unwrap();
    assert_eq!(wecom.msg_type, "markdown");
    assert_eq!(wecom.api_base, "https://qyapi.weixin.qq.com/cgi-bin");

    let webhook = config.webhook.unwrap();
    assert_eq!(webhook.timeout_secs, 10);
    assert!(webhook.headers.is_empty());

    assert_eq!(
        config.slack.unwrap().webhook_url,
        "https://hooks.slack.com/services/T0/B0/xyz"
    );

    assert!(config.dingding.is_none());
}

#[test]
fn missing_file_yields_defaults() {
    let config = NotifyConfig::load("/nonexistent/notifyhub.toml").unwrap();
    assert!(config.channels.is_empty());
    assert!(config.email.is_none());
}

#[test]
fn environment_variables_override_the_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "notifyhub.toml",
            r#"
channels = ["email"]

[dingding]
webhook_url = "https://oapi.dingtalk.com/robot/send?access_token=abc"
"#,
        )?;
        jail.set_env("NOTIFYHUB_CHANNELS", r#"["dingding"]"#);

        let config = NotifyConfig::load("notifyhub.toml").expect("load config");
        assert_eq!(config.channels, vec!["dingding"]);
        let ding = config.dingding.expect("dingding block");
        assert_eq!(
            ding.webhook_url,
            "https://oapi.dingtalk.com/robot/send?access_token=abc"
        );
        assert!(ding.secret.is_empty());
        Ok(())
    });
}
