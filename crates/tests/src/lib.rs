//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置文件 -> ErrorReporter -> 多个真实 sink 的完整链路
//! - 通知策略与 sink 失败隔离
//! - panic hook 与 UI 通道的去重

#[cfg(test)]
mod support {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};
    use std::thread;

    /// Minimal HTTP server recording request bodies, answers 200 to everything
    pub struct FakeEndpoint {
        pub url: String,
        pub bodies: Arc<Mutex<Vec<String>>>,
    }

    impl FakeEndpoint {
        pub fn start() -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let url = format!("http://{}/bugs", listener.local_addr().unwrap());
            let bodies = Arc::new(Mutex::new(Vec::new()));
            let recorded = Arc::clone(&bodies);

            thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(stream) = stream else { break };
                    let mut reader = BufReader::new(stream.try_clone().unwrap());
                    let mut content_length = 0usize;
                    loop {
                        let mut line = String::new();
                        if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                            break;
                        }
                        if let Some((key, value)) = line.split_once(':') {
                            if key.eq_ignore_ascii_case("content-length") {
                                content_length = value.trim().parse().unwrap_or(0);
                            }
                        }
                    }
                    let mut body = vec![0u8; content_length];
                    if reader.read_exact(&mut body).is_err() {
                        continue;
                    }
                    recorded
                        .lock()
                        .unwrap()
                        .push(String::from_utf8_lossy(&body).into_owned());

                    let mut stream = stream;
                    let _ = stream
                        .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                }
            });

            Self { url, bodies }
        }

        pub fn count(&self) -> usize {
            self.bodies.lock().unwrap().len()
        }
    }

    /// A localhost port nothing listens on
    pub fn closed_port() -> u16 {
        TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    /// Number of reports appended to a bug report file
    pub fn reports_in(path: &std::path::Path) -> usize {
        std::fs::read_to_string(path)
            .map(|content| content.matches("Exception classes:").count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod config_tests {
    use contracts::NotificationPolicy;
    use config_loader::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_unconfigured_http_sink_rejected_at_load() {
        let toml = r#"
[[sinks]]
name = "web"
sink_type = "http"
[sinks.params]
url = "http://localhost/bugs"
"#;
        let err = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn test_defaults() {
        let config = ConfigLoader::load_from_str("", ConfigFormat::Toml).unwrap();
        assert_eq!(config.notification, NotificationPolicy::Ask);
        assert_eq!(config.worker_threads, 2);
        assert!(config.sinks.is_empty());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use capture::{CaptureOutcome, ErrorReporter, FixedPrompt};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{CapturedError, NotificationPolicy};
    use tempfile::tempdir;

    use crate::support::{closed_port, reports_in, FakeEndpoint};

    fn config_toml(file: &std::path::Path, url: &str, mail_port: u16, policy: &str) -> String {
        format!(
            r#"
notification = "{policy}"

[app]
name = "Image Viewer"
version = "3.2.1"

[[sinks]]
name = "bug_file"
sink_type = "file"
[sinks.params]
path = "{file}"

[[sinks]]
name = "ops_mail"
sink_type = "mail"
[sinks.params]
from = "viewer@example.com"
to = "ops@example.com"
server = "127.0.0.1"
port = "{mail_port}"

[[sinks]]
name = "web"
sink_type = "http"
[sinks.params]
url = "{url}"
query = "product=viewer&error={{report}}"
"#,
            file = file.display(),
        )
    }

    /// Config file -> reporter -> file, mail and HTTP sinks.
    ///
    /// The mail relay is unreachable; the sinks after it still deliver.
    #[tokio::test]
    async fn test_e2e_config_to_sinks() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("BugReport.txt");
        let endpoint = FakeEndpoint::start();
        let toml = config_toml(&file, &endpoint.url, closed_port(), "silent");

        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        let reporter = ErrorReporter::from_config(&config).unwrap();
        assert_eq!(reporter.sink_names(), vec!["bug_file", "ops_mail", "web"]);

        let error = CapturedError::new("SaveError", "could not save image")
            .with_trace("at viewer::save")
            .caused_by(CapturedError::new("IoError", "permission denied").with_trace("at std::fs"));
        let summary = reporter
            .log_exception(error)
            .into_handle()
            .unwrap()
            .join()
            .await
            .unwrap();

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.failed, 1);

        let content = std::fs::read_to_string(&file).unwrap();
        assert!(content.starts_with("Application:       Image Viewer\n"));
        assert!(content.contains("Exception classes:\n   IoError\n   SaveError\n"));
        assert!(content.contains("at std::fs\n--- Next Call Stack:\nat viewer::save\n"));

        assert_eq!(endpoint.count(), 1);
        let body = endpoint.bodies.lock().unwrap()[0].clone();
        assert!(body.starts_with("product=viewer&error=Application%3A"));
        assert!(body.contains("permission+denied"));

        let metrics = reporter.dispatcher().metrics();
        assert_eq!(metrics[1].0, "ops_mail");
        assert_eq!(metrics[1].1.failure_count, 1);
    }

    #[tokio::test]
    async fn test_e2e_ask_declined_sends_nothing() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("BugReport.txt");
        let endpoint = FakeEndpoint::start();
        let toml = config_toml(&file, &endpoint.url, closed_port(), "ask");
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        let prompt = Arc::new(FixedPrompt::decline());
        let reporter = ErrorReporter::builder()
            .with_config(&config)
            .unwrap()
            .prompt(Arc::clone(&prompt))
            .build()
            .unwrap();

        let outcome = reporter.log_exception(CapturedError::new("Failure", "bad pixel"));

        assert!(matches!(outcome, CaptureOutcome::Declined));
        assert!(reporter.settle(Duration::from_secs(5)).await);
        assert_eq!(reports_in(&file), 0);
        assert_eq!(endpoint.count(), 0);
        assert_eq!(prompt.shown().len(), 1);
        assert!(prompt.shown()[0].contains("bad pixel"));
    }

    #[tokio::test]
    async fn test_e2e_overlapping_captures_keep_file_consistent() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("BugReport.txt");
        let endpoint = FakeEndpoint::start();
        let toml = config_toml(&file, &endpoint.url, closed_port(), "silent");
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        let reporter = ErrorReporter::from_config(&config).unwrap();

        for i in 0..5 {
            let reporter = reporter.clone();
            std::thread::spawn(move || {
                reporter.log_exception(CapturedError::new("Worker", format!("failure {i}")))
            })
            .join()
            .unwrap();
        }

        assert!(reporter.settle(Duration::from_secs(30)).await);
        assert_eq!(reports_in(&file), 5);
        assert_eq!(endpoint.count(), 5);
        assert_eq!(reporter.stats().dispatches, 5);
    }

    /// The only test that installs the process-wide panic hook
    #[tokio::test]
    async fn test_e2e_panic_hook_and_ui_guard() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("BugReport.txt");
        let endpoint = FakeEndpoint::start();
        let toml = config_toml(&file, &endpoint.url, closed_port(), "inform");
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        let prompt = Arc::new(FixedPrompt::decline());
        let reporter = ErrorReporter::builder()
            .with_config(&config)
            .unwrap()
            .prompt(Arc::clone(&prompt))
            .build()
            .unwrap();
        let hook = reporter.install_panic_hook();

        // Unhandled channel
        let worker = std::thread::Builder::new()
            .name("render".to_string())
            .spawn(|| panic!("texture upload failed"))
            .unwrap();
        assert!(worker.join().is_err());
        assert!(reporter.settle(Duration::from_secs(30)).await);
        assert_eq!(reports_in(&file), 1);

        let content = std::fs::read_to_string(&file).unwrap();
        assert!(content.contains("   panic\n"));
        assert!(content.contains("   texture upload failed\n"));
        assert!(content.contains("src/lib.rs:"));

        // UI channel: reported once, not again by the hook
        reporter.set_notification_policy(NotificationPolicy::Silent);
        let value: Option<()> = reporter.guard_ui(|| -> Result<(), std::io::Error> {
            panic!("click handler failed")
        });
        assert!(value.is_none());
        assert!(reporter.settle(Duration::from_secs(30)).await);
        assert_eq!(reports_in(&file), 2);
        assert_eq!(endpoint.count(), 2);

        hook.uninstall();

        assert_eq!(
            prompt.shown(),
            vec!["An unexpected error occurred - texture upload failed"]
        );
        let content = std::fs::read_to_string(&file).unwrap();
        assert_eq!(content.matches("click handler failed").count(), 1);
    }
}
