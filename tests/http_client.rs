use reqwest::Client;
use serde_json::json;
use skilltree_quiz::api::connection::{
    AttemptSubmission, Connection, RecordAttempt, RetrieveQuiz, SubmittedAnswer, ValidateContent,
    VideoStore,
};
use skilltree_quiz::api::share::ShareSkills;
use skilltree_quiz::{QuizError, VideoAttrs};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug)]
struct Received {
    method: String,
    path: String,
    body: String,
}

impl Received {
    fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Serves exactly one request with `status`, extra header lines and `body`.
async fn serve_once(
    status: &'static str,
    headers: &'static str,
    body: &'static str,
) -> (Connection, JoinHandle<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let head_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before request head");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < head_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before request body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let mut request_line = head.lines().next().unwrap().split_whitespace();
        let method = request_line.next().unwrap().to_string();
        let path = request_line.next().unwrap().to_string();

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n{headers}\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();

        Received {
            method,
            path,
            body: String::from_utf8_lossy(&buf[head_end..head_end + content_length]).to_string(),
        }
    });

    let base = format!("http://{addr}/").parse().unwrap();
    (Connection::new(Client::new(), base), handle)
}

#[tokio::test]
async fn content_validation_posts_the_value() {
    let (connection, server) = serve_once(
        "200 OK",
        "",
        r#"{"valid":false,"msg":"paragraphs may not contain jabberwocky"}"#,
    )
    .await;

    let verdict = connection.validate_description("jabberwocky").await.unwrap();
    let received = server.await.unwrap();

    assert_eq!(received.method, "POST");
    assert_eq!(received.path, "/api/validation/description");
    assert_eq!(received.json(), json!({ "value": "jabberwocky" }));
    assert!(!verdict.valid);
    assert_eq!(verdict.msg.as_deref(), Some("paragraphs may not contain jabberwocky"));
}

#[tokio::test]
async fn quiz_is_fetched_by_id() {
    let (connection, server) = serve_once(
        "200 OK",
        "",
        r#"{"quizId":"quiz 1","name":"This is survey 1","quizType":"Survey","pointIncrement":150,"questions":[]}"#,
    )
    .await;

    let quiz = connection.retrieve_quiz("quiz 1").await.unwrap();
    let received = server.await.unwrap();

    assert_eq!(received.method, "GET");
    assert_eq!(received.path, "/api/quizzes/quiz%201");
    assert_eq!(quiz.point_increment(), 150);
}

#[tokio::test]
async fn attempt_completion_posts_answers() {
    let (connection, server) = serve_once("200 OK", "", r#"{"passed":true}"#).await;
    let submission = AttemptSubmission {
        attempt_id: Uuid::nil(),
        answers: vec![SubmittedAnswer {
            question_id: 2,
            selected_option_ids: vec![1],
            text: None,
        }],
    };

    let report = connection.complete_attempt("quiz1", &submission).await.unwrap();
    let received = server.await.unwrap();

    assert!(report.passed);
    assert_eq!(received.method, "POST");
    assert_eq!(
        received.path,
        format!("/api/quizzes/quiz1/attempt/{}/complete", Uuid::nil())
    );
    assert_eq!(received.json()["answers"][0]["selectedOptionIds"], json!([1]));
}

#[tokio::test]
async fn share_and_unshare_use_put_and_delete() {
    let (connection, server) = serve_once("200 OK", "", "").await;
    connection.share_skill("proj 1", "skill/1", "proj2").await.unwrap();
    let received = server.await.unwrap();
    assert_eq!(received.method, "PUT");
    assert_eq!(
        received.path,
        "/admin/projects/proj%201/skills/skill%2F1/shared/projects/proj2"
    );

    let (connection, server) = serve_once("200 OK", "", "").await;
    connection.delete_skill_share("proj1", "skill1", "proj2").await.unwrap();
    let received = server.await.unwrap();
    assert_eq!(received.method, "DELETE");
    assert_eq!(received.path, "/admin/projects/proj1/skills/skill1/shared/projects/proj2");
}

#[tokio::test]
async fn shared_lists_are_fetched() {
    let (connection, server) = serve_once(
        "200 OK",
        "",
        r#"[{"skillId":"skill1","skillName":"Very Great Skill 1","projectId":"proj2"}]"#,
    )
    .await;
    let skills = connection.shared_with_me_skills("proj1").await.unwrap();
    let received = server.await.unwrap();

    assert_eq!(received.method, "GET");
    assert_eq!(received.path, "/admin/projects/proj1/sharedWithMe");
    assert_eq!(skills[0].skill_name, "Very Great Skill 1");

    let (connection, server) = serve_once("200 OK", "", "[]").await;
    assert!(connection.shared_skills("proj1").await.unwrap().is_empty());
    assert_eq!(server.await.unwrap().path, "/admin/projects/proj1/shared");
}

#[tokio::test]
async fn video_settings_are_posted_and_deleted() {
    let (connection, server) = serve_once("200 OK", "", "").await;
    let attrs = VideoAttrs {
        video_url: "http://some.vid".into(),
        ..VideoAttrs::default()
    };
    connection.save_video_attrs("proj1", "skill1", &attrs).await.unwrap();
    let received = server.await.unwrap();
    assert_eq!(received.method, "POST");
    assert_eq!(received.path, "/admin/projects/proj1/skills/skill1/video");
    assert_eq!(received.json()["videoUrl"], "http://some.vid");

    let (connection, server) = serve_once("200 OK", "", "").await;
    connection.delete_video_attrs("proj1", "skill1").await.unwrap();
    assert_eq!(server.await.unwrap().method, "DELETE");
}

#[tokio::test]
async fn agreement_header_on_success_raises_the_flag() {
    let (connection, server) = serve_once("200 OK", "skills-display-ua: true\r\n", "[]").await;
    assert!(!connection.user_agreement().is_raised());

    connection.shared_skills("proj1").await.unwrap();
    server.await.unwrap();

    assert!(connection.user_agreement().is_raised());
}

#[tokio::test]
async fn agreement_header_on_error_is_ignored() {
    let (connection, server) = serve_once(
        "500 Internal Server Error",
        "skills-display-ua: true\r\n",
        "{}",
    )
    .await;

    let err = connection.shared_skills("proj1").await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(err, QuizError::Http(_)));
    assert!(!connection.user_agreement().is_raised());
}
