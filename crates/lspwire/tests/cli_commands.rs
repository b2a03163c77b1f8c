#![cfg(all(unix, feature = "cli"))]

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

const ADD_REQUEST: &str = r#"{"jsonrpc":"2.0","id":1,"method":"add","params":[2,3]}"#;
const ADD_RESPONSE: &[u8] = b"Content-Length: 35\r\n\r\n{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":5}";

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/lspwire-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn frame(body: &str) -> Vec<u8> {
    let mut out = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
    out.extend_from_slice(body.as_bytes());
    out
}

fn run_with_stdin(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_lspwire"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("lspwire should start");

    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(stdin)
        .expect("stdin should accept input");

    child.wait_with_output().expect("lspwire should exit")
}

fn split_frame(bytes: &[u8]) -> (String, Value) {
    let text = std::str::from_utf8(bytes).expect("frame should be utf-8");
    let (header, body) = text.split_once("\r\n\r\n").expect("frame should have a header");
    (
        header.to_string(),
        serde_json::from_str(body).expect("body should be json"),
    )
}

fn wait_for_socket(path: &Path, timeout: Duration) -> UnixStream {
    let start = Instant::now();
    loop {
        if let Ok(stream) = UnixStream::connect(path) {
            return stream;
        }
        if start.elapsed() >= timeout {
            panic!("socket never became connectable");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn encode_writes_exact_frame() {
    let output = Command::new(env!("CARGO_BIN_EXE_lspwire"))
        .args(["encode", "--json", r#"{"jsonrpc":"2.0","id":1,"result":5}"#])
        .output()
        .expect("encode should run");

    assert!(output.status.success());
    assert_eq!(output.stdout, ADD_RESPONSE);
}

#[test]
fn encode_reads_body_from_stdin() {
    let output = run_with_stdin(&["encode"], ADD_REQUEST.as_bytes());
    assert!(output.status.success());
    assert_eq!(output.stdout, frame(ADD_REQUEST));
}

#[test]
fn encode_with_charset_adds_content_type() {
    let output = Command::new(env!("CARGO_BIN_EXE_lspwire"))
        .args(["encode", "--charset", "utf-16", "--json", r#"{"jsonrpc":"2.0","method":"x"}"#])
        .output()
        .expect("encode should run");

    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("Content-Type: application/vscode-jsonrpc; charset=utf-16\r\n"));
}

#[test]
fn encode_rejects_non_jsonrpc_body() {
    let output = Command::new(env!("CARGO_BIN_EXE_lspwire"))
        .args(["encode", "--json", r#"{"x":1}"#])
        .output()
        .expect("encode should run");

    assert_eq!(output.status.code(), Some(60));
    assert!(output.stdout.is_empty());
}

#[test]
fn encode_without_body_is_usage_error() {
    let output = run_with_stdin(&["encode"], b"  \n");
    assert_eq!(output.status.code(), Some(64));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no message body"));
}

#[test]
fn decode_prints_one_json_line_per_message() {
    let mut input = frame(ADD_REQUEST);
    input.extend(frame(r#"{"jsonrpc":"2.0","method":"initialized","params":{}}"#));

    let output = run_with_stdin(&["--format", "json", "decode"], &input);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    let lines: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be json"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["kind"], "request");
    assert_eq!(lines[0]["method"], "add");
    assert_eq!(lines[0]["content_length"], ADD_REQUEST.len());
    assert_eq!(lines[0]["message"]["params"], serde_json::json!([2, 3]));
    assert_eq!(lines[1]["kind"], "notification");
    assert!(lines[1]["id"].is_null());
}

#[test]
fn decode_reads_file_argument() {
    let dir = unique_temp_dir("decode");
    let path = dir.join("frames.bin");
    std::fs::write(&path, frame(ADD_REQUEST)).expect("frames file should be writable");

    let output = Command::new(env!("CARGO_BIN_EXE_lspwire"))
        .args(["--format", "raw", "decode"])
        .arg(&path)
        .output()
        .expect("decode should run");

    assert!(output.status.success());
    assert_eq!(output.stdout, format!("{ADD_REQUEST}\n").into_bytes());
}

#[test]
fn decode_truncated_input_is_data_invalid() {
    let mut input = b"Content-Length: 50\r\n\r\n".to_vec();
    input.extend_from_slice(b"0123456789");

    let output = run_with_stdin(&["decode"], &input);
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn decode_missing_file_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_lspwire"))
        .args(["decode", "/nonexistent/lspwire/frames.bin"])
        .output()
        .expect("decode should run");

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn serve_stdio_answers_add() {
    let output = run_with_stdin(&["serve"], &frame(ADD_REQUEST));
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(output.stdout, ADD_RESPONSE);
}

#[test]
fn serve_stdio_reports_unknown_method() {
    let output = run_with_stdin(
        &["serve"],
        &frame(r#"{"jsonrpc":"2.0","id":"a","method":"multiply","params":[2,3]}"#),
    );
    assert!(output.status.success());

    let (header, body) = split_frame(&output.stdout);
    assert!(header.starts_with("Content-Length: "));
    assert_eq!(body["id"], "a");
    assert_eq!(body["error"]["code"], -32601);
}

#[test]
fn serve_over_unix_socket() {
    let dir = unique_temp_dir("serve");
    let sock_path = dir.join("rpc.sock");

    let mut child = Command::new(env!("CARGO_BIN_EXE_lspwire"))
        .arg("--log-level")
        .arg("error")
        .arg("serve")
        .arg("--socket")
        .arg(&sock_path)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("serve should start");

    let mut stream = wait_for_socket(&sock_path, Duration::from_secs(3));
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout should be settable");
    stream
        .write_all(&frame(ADD_REQUEST))
        .expect("request should be written");

    let mut received = vec![0u8; ADD_RESPONSE.len()];
    stream
        .read_exact(&mut received)
        .expect("response should arrive");
    assert_eq!(received, ADD_RESPONSE);

    let _ = child.kill();
    let _ = child.wait();
}

#[test]
fn version_prints_name() {
    let output = Command::new(env!("CARGO_BIN_EXE_lspwire"))
        .args(["version", "--extended"])
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: lspwire"));
    assert!(stdout.contains("version: "));
}
