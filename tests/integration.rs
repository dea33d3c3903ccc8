use quiz_exam::faculty::FacultyDirectory;
use quiz_exam::routes::build_router;
use quiz_exam::state::AppState;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::json;

async fn spawn_server() -> (String, AppState) {
    let faculty = FacultyDirectory::from_pairs([("hod@college.edu", "secret123")]);
    let state = AppState::new(faculty, 30, Some(2024));
    let app = build_router(state.clone(), "http://localhost:5173");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

fn cookie_client() -> reqwest::Client {
    reqwest::Client::builder().cookie_store(true).build().unwrap()
}

async fn faculty_auth(base: &str, client: &reqwest::Client) -> String {
    let resp = client
        .post(format!("{}/api/v1/faculty/login", base))
        .json(&json!({"email": "hod@college.edu", "password": "secret123"}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let csrf = resp
        .cookies()
        .find(|c| c.name() == "csrf_token")
        .map(|c| c.value().to_string())
        .unwrap();
    csrf
}

fn csrf_headers(token: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert("x-csrf-token", HeaderValue::from_str(token).unwrap());
    h
}

fn question_paragraphs() -> serde_json::Value {
    json!({
        "paragraphs": [
            "Unit 1 Quiz",
            "",
            "1. What is 2+2?",
            "A) 3", "B) 4", "C) 5", "D) 6",
            "Answer: B",
            "2. Capital of France?",
            "A) Paris", "B) Rome", "C) Madrid", "D) Berlin",
            "Answer: A",
            "3. Largest planet?",
            "A) Mars", "B) Venus", "C) Jupiter", "D) Earth"
        ]
    })
}

async fn setup_exam(base: &str, client: &reqwest::Client, body: serde_json::Value) -> String {
    let csrf = faculty_auth(base, client).await;
    let upload = client
        .post(format!("{}/api/v1/faculty/questions", base))
        .headers(csrf_headers(&csrf))
        .json(&question_paragraphs())
        .send()
        .await
        .unwrap();
    assert_eq!(upload.status(), 200);
    assert_eq!(upload.json::<serde_json::Value>().await.unwrap()["count"], 3);

    let code = client
        .post(format!("{}/api/v1/faculty/exam-code", base))
        .headers(csrf_headers(&csrf))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(code.status(), 201);
    code.json::<serde_json::Value>().await.unwrap()["code"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn faculty_login_rejects_bad_credentials() {
    let (base, _) = spawn_server().await;
    let client = cookie_client();
    let resp = client
        .post(format!("{}/api/v1/faculty/login", base))
        .json(&json!({"email": "hod@college.edu", "password": "nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body = resp.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");

    let upload = client
        .post(format!("{}/api/v1/faculty/questions", base))
        .json(&question_paragraphs())
        .send()
        .await
        .unwrap();
    assert_eq!(upload.status(), 401);
}

#[tokio::test]
async fn faculty_email_is_matched_exactly() {
    let (base, _) = spawn_server().await;
    let resp = cookie_client()
        .post(format!("{}/api/v1/faculty/login", base))
        .json(&json!({"email": " hod@college.edu ", "password": "secret123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn padded_exam_code_is_rejected() {
    let (base, state) = spawn_server().await;
    let faculty = cookie_client();
    let code = setup_exam(&base, &faculty, json!({"timerEnabled": false})).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/v1/student/start", base))
        .json(&json!({"rollNumber": "21A02", "name": "Bala", "code": format!("  {}\n", code)}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body = resp.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_EXAM_CODE");
    assert!(state.students.is_empty());
}

#[tokio::test]
async fn faculty_mutation_requires_csrf() {
    let (base, _) = spawn_server().await;
    let client = cookie_client();
    faculty_auth(&base, &client).await;
    let resp = client
        .post(format!("{}/api/v1/faculty/exam-code", base))
        .json(&json!({"timerEnabled": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn invalid_timer_is_rejected() {
    let (base, _) = spawn_server().await;
    let client = cookie_client();
    let csrf = faculty_auth(&base, &client).await;
    let resp = client
        .post(format!("{}/api/v1/faculty/exam-code", base))
        .headers(csrf_headers(&csrf))
        .json(&json!({"timerEnabled": true, "durationMinutes": 500}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn student_flow_scores_and_ranks() {
    let (base, state) = spawn_server().await;
    let faculty = cookie_client();
    let code = setup_exam(&base, &faculty, json!({"timerEnabled": true, "durationMinutes": 45})).await;
    assert!(code.starts_with("CA"));
    assert_eq!(code.len(), 8);

    let student = reqwest::Client::new();
    let wrong = student
        .post(format!("{}/api/v1/student/start", base))
        .json(&json!({"rollNumber": "21A01", "name": "Asha", "code": "CA000000"}))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);
    assert!(state.students.is_empty());

    let start = student
        .post(format!("{}/api/v1/student/start", base))
        .json(&json!({"rollNumber": "21A01", "name": "Asha", "code": code}))
        .send()
        .await
        .unwrap();
    assert_eq!(start.status(), 201);
    let view = start.json::<serde_json::Value>().await.unwrap();
    assert_eq!(view["state"], "inProgress");
    assert_eq!(view["totalQuestions"], 3);
    assert_eq!(view["remainingMinutes"], 45);
    assert_eq!(view["hasPrevious"], false);
    assert!(view["question"]["options"].as_array().unwrap().len() == 4);
    assert!(view["question"].get("correctAnswer").is_none());
    let id = view["sessionId"].as_str().unwrap().to_string();

    let prev = student
        .post(format!("{}/api/v1/student/sessions/{}/navigate", base, id))
        .json(&json!({"direction": "previous"}))
        .send()
        .await
        .unwrap();
    assert_eq!(prev.json::<serde_json::Value>().await.unwrap()["question"]["number"], 1);

    let answered = student
        .post(format!("{}/api/v1/student/sessions/{}/answer", base, id))
        .json(&json!({"letter": "B"}))
        .send()
        .await
        .unwrap();
    let answered = answered.json::<serde_json::Value>().await.unwrap();
    assert_eq!(answered["question"]["selected"], "B");
    assert_eq!(answered["answered"], 1);

    let out_of_range = student
        .post(format!("{}/api/v1/student/sessions/{}/answer", base, id))
        .json(&json!({"letter": "A", "index": 9}))
        .send()
        .await
        .unwrap();
    assert_eq!(out_of_range.status(), 400);

    let submitted = student
        .post(format!("{}/api/v1/student/sessions/{}/submit", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(submitted.status(), 200);
    let submitted = submitted.json::<serde_json::Value>().await.unwrap();
    assert_eq!(submitted["state"], "finished");
    assert_eq!(submitted["result"]["total"], 3);

    let again = student
        .post(format!("{}/api/v1/student/sessions/{}/submit", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), 409);

    let results = faculty
        .get(format!("{}/api/v1/faculty/results", base))
        .send()
        .await
        .unwrap();
    assert_eq!(results.status(), 200);
    let results = results.json::<serde_json::Value>().await.unwrap();
    assert_eq!(results["total"], 1);
    assert_eq!(results["items"][0]["Roll No"], "21A01");
    assert_eq!(results["items"][0]["Rank"], 1);

    let csv = faculty
        .get(format!("{}/api/v1/faculty/results.csv", base))
        .send()
        .await
        .unwrap();
    assert_eq!(csv.status(), 200);
    let text = csv.text().await.unwrap();
    assert!(text.starts_with("Roll No,Name,Marks,Rank"));
    assert!(text.contains("21A01,Asha,"));
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let (base, _) = spawn_server().await;
    let resp = reqwest::Client::new()
        .get(format!("{}/api/v1/student/sessions/{}", base, uuid_like()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

fn uuid_like() -> &'static str {
    "5f3c2a34-6c55-4f43-9d0c-0d4a7b2e9a11"
}
