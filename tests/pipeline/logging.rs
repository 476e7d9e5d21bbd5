use std::{
    io,
    sync::{Arc, Mutex},
};

use panacea::{cli::Command, commands::execute};
use tracing_subscriber::{fmt, layer::SubscriberExt};

use crate::support::Workspace;

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .expect("log buffer lock should not be poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn given_command_when_executed_then_its_log_lines_carry_the_run_id_span() {
    let workspace = Workspace::new("command-span");
    let ctx = workspace.context();
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(move || writer.clone()),
    );
    let _default = tracing::subscriber::set_default(subscriber);

    execute(&ctx, Command::Status)
        .await
        .expect("status should succeed");

    let captured = String::from_utf8(logs.0.lock().expect("log buffer").clone())
        .expect("json logs are utf-8");
    let started: Vec<serde_json::Value> = captured
        .lines()
        .map(|line| serde_json::from_str(line).expect("each log line is json"))
        .filter(|line: &serde_json::Value| line["fields"]["message"] == "command_started")
        .collect();
    assert_eq!(started.len(), 1, "{captured}");
    assert_eq!(started[0]["span"]["name"], "command");
    assert_eq!(started[0]["span"]["command"], "status");
    assert_eq!(started[0]["span"]["run_id"], ctx.run_id.as_str());
}
