//! ==============================================================================
//! dashboard.rs - web dashboard and json api
//! ==============================================================================
//!
//! purpose:
//!     serves the single dashboard page (stat cards, history charts, alert
//!     panel, chat widget) and a small json api over the same state.
//!     rendering is pure formatting of the shared telemetry and chat state.
//!
//! routes:
//!     GET  /             html dashboard (refreshes itself every tick while
//!                        the chat is closed, so typing is never interrupted)
//!     GET  /api          telemetry snapshot as json
//!     GET  /api/chat     chat state as json
//!     POST /api/chat     {"text": "..."} -> queue a chat message
//!     POST /chat         html form variant of the above, redirects to /
//!     POST /chat/toggle  open or close the chat widget, redirects to /
//!
//! relationships:
//!     - reads: simulator.rs (SharedTelemetry)
//!     - drives: chat.rs (ChatWidget)
//!     - used by: main.rs (run_server)
//!
//! ==============================================================================

use crate::chat::{ChatState, ChatWidget};
use crate::domain::{Reading, Speaker};
use crate::llm::TextGenerator;
use crate::simulator::{SharedTelemetry, Telemetry};

use anyhow::{Context, Result};
use axum::{
    extract::{Form, State},
    response::{Html, Json, Redirect},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::fmt::Write as _;
use std::future::Future;
use tower_http::cors::CorsLayer;

// ==============================================================================
// shared state
// ==============================================================================

pub struct AppState<G> {
    pub telemetry: SharedTelemetry,
    pub chat: ChatWidget<G>,
    /// page auto-refresh, matches the tick interval
    pub refresh_seconds: u64,
}

impl<G> Clone for AppState<G> {
    fn clone(&self) -> Self {
        Self {
            telemetry: self.telemetry.clone(),
            chat: self.chat.clone(),
            refresh_seconds: self.refresh_seconds,
        }
    }
}

// ==============================================================================
// web server
// ==============================================================================

pub fn router<G: TextGenerator>(state: AppState<G>) -> Router {
    Router::new()
        .route("/", get(dashboard_handler::<G>))
        .route("/api", get(api_handler::<G>))
        .route("/api/chat", get(chat_state_handler::<G>).post(chat_api_handler::<G>))
        .route("/chat", post(chat_form_handler::<G>))
        .route("/chat/toggle", post(chat_toggle_handler::<G>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server<G, F>(state: AppState<G>, bind: &str, shutdown: F) -> Result<()>
where
    G: TextGenerator,
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("web server error")?;
    Ok(())
}

#[derive(Deserialize, Debug)]
pub struct ChatRequest {
    pub text: String,
}

async fn dashboard_handler<G: TextGenerator>(State(app): State<AppState<G>>) -> Html<String> {
    let telemetry = app.telemetry.read().await.clone();
    let chat = app.chat.snapshot().await;
    Html(render_page(&telemetry, &chat, app.refresh_seconds))
}

/// json api endpoint for programmatic access
async fn api_handler<G: TextGenerator>(State(app): State<AppState<G>>) -> Json<Telemetry> {
    let telemetry = app.telemetry.read().await;
    Json(telemetry.clone())
}

async fn chat_state_handler<G: TextGenerator>(State(app): State<AppState<G>>) -> Json<ChatState> {
    Json(app.chat.snapshot().await)
}

/// POST /api/chat {"text": "..."}
async fn chat_api_handler<G: TextGenerator>(
    State(app): State<AppState<G>>,
    Json(request): Json<ChatRequest>,
) -> Json<serde_json::Value> {
    if app.chat.send(&request.text).await {
        Json(serde_json::json!({"status": "accepted"}))
    } else {
        Json(serde_json::json!({"status": "ignored"}))
    }
}

async fn chat_form_handler<G: TextGenerator>(
    State(app): State<AppState<G>>,
    Form(request): Form<ChatRequest>,
) -> Redirect {
    app.chat.send(&request.text).await;
    Redirect::to("/")
}

async fn chat_toggle_handler<G: TextGenerator>(State(app): State<AppState<G>>) -> Redirect {
    app.chat.toggle().await;
    Redirect::to("/")
}

// ==============================================================================
// rendering
// ==============================================================================

const STYLE: &str = r#"
body { font-family: system-ui; margin: 0; padding: 2rem; background: #1a1a2e; color: #eee; }
h1 { color: #f5b700; margin-top: 0; }
.cards { display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 1rem; }
.card, .panel { background: #16213e; padding: 1rem; border-radius: 8px; }
.card .value { font-size: 1.8rem; color: #f5b700; }
.charts { display: grid; grid-template-columns: repeat(auto-fit, minmax(320px, 1fr)); gap: 1rem; margin: 1rem 0; }
.alert { color: #ff6b6b; margin: 0.3rem 0; }
.stable { color: #6bff95; }
.chat { position: fixed; right: 2rem; bottom: 2rem; width: 340px; }
.transcript { max-height: 300px; overflow-y: auto; }
.user { text-align: right; color: #9ad0ff; }
.assistant { color: #eee; }
.typing { color: #888; font-style: italic; }
"#;

/// the whole dashboard page
pub fn render_page(telemetry: &Telemetry, chat: &ChatState, refresh_seconds: u64) -> String {
    let mut page = String::with_capacity(8 * 1024);
    let _ = write!(
        page,
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
{refresh}<title>Hive Monitor</title>
<style>{style}</style>
</head>
<body>
<h1>🐝 Hive Monitor</h1>
"#,
        refresh = refresh_tag(chat, refresh_seconds),
        style = STYLE,
    );

    page.push_str(&render_cards(&telemetry.current));

    let history: Vec<&Reading> = telemetry.history.iter().collect();
    let labels: Vec<&str> = history.iter().map(|r| r.timestamp.as_str()).collect();
    page.push_str("<div class=\"charts\">\n");
    page.push_str(&render_chart(
        "Temperature (°C)",
        &history.iter().map(|r| r.temperature).collect::<Vec<_>>(),
        &labels,
        "#ff9f43",
    ));
    page.push_str(&render_chart(
        "Weight (kg)",
        &history.iter().map(|r| r.weight).collect::<Vec<_>>(),
        &labels,
        "#f5b700",
    ));
    page.push_str(&render_chart(
        "Vibration (Hz)",
        &history.iter().map(|r| r.vibration).collect::<Vec<_>>(),
        &labels,
        "#54a0ff",
    ));
    page.push_str("</div>\n");

    page.push_str(&render_alerts(telemetry));
    page.push_str(&render_chat(chat));
    page.push_str("</body>\n</html>\n");
    page
}

/// auto-refresh meta tag; left out while the chat is open
fn refresh_tag(chat: &ChatState, refresh_seconds: u64) -> String {
    if chat.open {
        String::new()
    } else {
        format!("<meta http-equiv=\"refresh\" content=\"{}\">\n", refresh_seconds.max(1))
    }
}

fn render_cards(current: &Reading) -> String {
    format!(
        r#"<div class="cards">
<div class="card"><div>Temperature</div><div class="value">{:.1} °C</div></div>
<div class="card"><div>Weight</div><div class="value">{:.2} kg</div></div>
<div class="card"><div>Vibration</div><div class="value">{:.1} Hz</div></div>
<div class="card"><div>Location</div><div class="value">{:.5}, {:.5}</div></div>
<div class="card"><div>Updated</div><div class="value">{}</div></div>
</div>
"#,
        current.temperature,
        current.weight,
        current.vibration,
        current.latitude,
        current.longitude,
        html_escape(&current.timestamp),
    )
}

const CHART_WIDTH: f64 = 320.0;
const CHART_HEIGHT: f64 = 120.0;
const CHART_PAD: f64 = 8.0;

/// inline svg line chart; values are oldest first
pub fn render_chart(title: &str, values: &[f64], labels: &[&str], color: &str) -> String {
    let mut svg = format!(
        "<div class=\"panel\"><div>{}</div>\n<svg viewBox=\"0 0 {} {}\" width=\"100%\">\n",
        html_escape(title),
        CHART_WIDTH,
        CHART_HEIGHT
    );

    if !values.is_empty() {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let span = if max - min > f64::EPSILON { max - min } else { 1.0 };
        let step = if values.len() > 1 {
            (CHART_WIDTH - 2.0 * CHART_PAD) / (values.len() - 1) as f64
        } else {
            0.0
        };

        let points: Vec<String> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let x = CHART_PAD + step * i as f64;
                let y = CHART_HEIGHT - CHART_PAD - (v - min) / span * (CHART_HEIGHT - 2.0 * CHART_PAD);
                format!("{:.1},{:.1}", x, y)
            })
            .collect();

        let _ = writeln!(
            svg,
            "<polyline fill=\"none\" stroke=\"{}\" stroke-width=\"2\" points=\"{}\"/>",
            color,
            points.join(" ")
        );
        if let (Some(first), Some(last)) = (labels.first(), labels.last()) {
            let _ = writeln!(
                svg,
                "<text x=\"{pad}\" y=\"{h}\" fill=\"#888\" font-size=\"9\">{first}</text>\
                 <text x=\"{right}\" y=\"{h}\" fill=\"#888\" font-size=\"9\" text-anchor=\"end\">{last}</text>",
                pad = CHART_PAD,
                right = CHART_WIDTH - CHART_PAD,
                h = CHART_HEIGHT,
                first = html_escape(first),
                last = html_escape(last),
            );
        }
    }

    svg.push_str("</svg></div>\n");
    svg
}

fn render_alerts(telemetry: &Telemetry) -> String {
    let mut panel = String::from("<div class=\"panel\"><h2>Alerts</h2>\n");
    let (class, icon) = if telemetry.alerts.is_empty() {
        ("stable", "✅")
    } else {
        ("alert", "⚠️")
    };
    for line in telemetry.alerts.panel_lines() {
        let _ = writeln!(panel, "<p class=\"{}\">{} {}</p>", class, icon, html_escape(line));
    }
    panel.push_str("</div>\n");
    panel
}

fn render_chat(chat: &ChatState) -> String {
    let mut widget = String::from("<div class=\"chat\">\n");
    let label = if chat.open { "Close assistant" } else { "💬 Ask the hive assistant" };
    let _ = writeln!(
        widget,
        "<form method=\"post\" action=\"/chat/toggle\"><button type=\"submit\">{}</button></form>",
        label
    );

    if chat.open {
        widget.push_str("<div class=\"panel\"><div class=\"transcript\">\n");
        for message in &chat.transcript {
            let class = match message.speaker {
                Speaker::User => "user",
                Speaker::Assistant => "assistant",
            };
            let _ = writeln!(widget, "<p class=\"{}\">{}</p>", class, html_escape(&message.text));
        }
        if chat.pending {
            // no auto-refresh while open, so offer a manual one
            widget.push_str("<p class=\"typing\">Assistant is typing… <a href=\"/\">refresh</a></p>\n");
        }
        widget.push_str(
            "</div>\n<form method=\"post\" action=\"/chat\">\
             <input name=\"text\" autocomplete=\"off\" placeholder=\"Ask about your hive\">\
             <button type=\"submit\">Send</button></form>\n</div>\n",
        );
    }

    widget.push_str("</div>\n");
    widget
}

/// escape html special characters to prevent xss
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::STABLE_MESSAGE;
    use crate::domain::ChatMessage;
    use anyhow::anyhow;

    struct Offline;

    impl TextGenerator for Offline {
        async fn generate(&self, _persona: &str, _text: &str) -> Result<String> {
            Err(anyhow!("offline"))
        }
    }

    fn reading(temperature: f64) -> Reading {
        Reading {
            temperature,
            weight: 12.34,
            vibration: 4.2,
            latitude: 12.97161,
            longitude: 77.59462,
            timestamp: "09:15".to_string(),
        }
    }

    fn app() -> AppState<Offline> {
        AppState {
            telemetry: Telemetry::new(reading(35.0), 15, 3).shared(),
            chat: ChatWidget::new(Offline, "persona"),
            refresh_seconds: 5,
        }
    }

    #[test]
    fn page_shows_latest_reading_and_stable_panel() {
        let telemetry = Telemetry::new(reading(35.5), 15, 3);
        let page = render_page(&telemetry, &ChatState::default(), 5);
        assert!(page.contains("35.5 °C"));
        assert!(page.contains("12.34 kg"));
        assert!(page.contains("4.2 Hz"));
        assert!(page.contains("12.97161, 77.59462"));
        assert!(page.contains(STABLE_MESSAGE));
        assert!(page.contains("content=\"5\""));
    }

    #[test]
    fn alerts_replace_stable_message() {
        let mut telemetry = Telemetry::new(reading(35.0), 15, 3);
        telemetry.alerts.merge(vec!["Low Weight Alert: test".to_string()]);
        let page = render_page(&telemetry, &ChatState::default(), 5);
        assert!(page.contains("Low Weight Alert: test"));
        assert!(!page.contains(STABLE_MESSAGE));
    }

    #[test]
    fn closed_chat_hides_transcript() {
        let telemetry = Telemetry::new(reading(35.0), 15, 3);
        let chat = ChatState {
            transcript: vec![ChatMessage::user("secret question")],
            ..ChatState::default()
        };
        let page = render_page(&telemetry, &chat, 5);
        assert!(!page.contains("secret question"));
        assert!(page.contains("Ask the hive assistant"));
    }

    #[test]
    fn open_chat_escapes_user_text_and_shows_typing() {
        let telemetry = Telemetry::new(reading(35.0), 15, 3);
        let chat = ChatState {
            open: true,
            pending: true,
            transcript: vec![ChatMessage::user("<script>alert(1)</script>")],
            ..ChatState::default()
        };
        let page = render_page(&telemetry, &chat, 5);
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!page.contains("<script>alert(1)"));
        assert!(page.contains("Assistant is typing"));
    }

    #[test]
    fn chart_has_one_point_per_value() {
        let svg = render_chart("Weight", &[1.0, 2.0, 3.0], &["a", "b", "c"], "#fff");
        let points = svg
            .split("points=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap();
        assert_eq!(points.split(' ').count(), 3);
        assert!(svg.contains(">a</text>"));
        assert!(svg.contains(">c</text>"));
    }

    #[test]
    fn flat_and_empty_charts_render() {
        let flat = render_chart("Flat", &[5.0, 5.0], &["x", "y"], "#fff");
        assert!(flat.contains("polyline"));
        assert!(!flat.contains("NaN"));

        let empty = render_chart("Empty", &[], &[], "#fff");
        assert!(!empty.contains("polyline"));
    }

    #[tokio::test]
    async fn api_returns_current_history_and_alerts() {
        let app = app();
        let Json(telemetry) = api_handler(State(app.clone())).await;
        let value = serde_json::to_value(&telemetry).unwrap();
        assert_eq!(value["current"]["temperature"], 35.0);
        assert_eq!(value["history"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["alerts"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn chat_api_ignores_blank_and_folds_failures() {
        let app = app();

        let Json(ignored) = chat_api_handler(
            State(app.clone()),
            Json(ChatRequest { text: "  ".to_string() }),
        )
        .await;
        assert_eq!(ignored["status"], "ignored");

        let Json(accepted) = chat_api_handler(
            State(app.clone()),
            Json(ChatRequest { text: "status?".to_string() }),
        )
        .await;
        assert_eq!(accepted["status"], "accepted");

        app.chat.settle().await;
        let Json(state) = chat_state_handler(State(app.clone())).await;
        assert_eq!(state.transcript.len(), 2);
        assert_eq!(state.transcript[1].text, crate::chat::OFFLINE_REPLY);
        assert!(!state.pending);
    }

    #[tokio::test]
    async fn toggle_route_flips_visibility() {
        let app = app();
        let _redirect = chat_toggle_handler(State(app.clone())).await;
        assert!(app.chat.snapshot().await.open);
        let _redirect = chat_toggle_handler(State(app.clone())).await;
        assert!(!app.chat.snapshot().await.open);
    }

    #[test]
    fn open_chat_stops_auto_refresh() {
        let telemetry = Telemetry::new(reading(35.0), 15, 3);
        let closed = render_page(&telemetry, &ChatState::default(), 5);
        assert!(closed.contains("http-equiv=\"refresh\""));

        let open = ChatState { open: true, ..ChatState::default() };
        let page = render_page(&telemetry, &open, 5);
        assert!(!page.contains("http-equiv=\"refresh\""));
        assert!(page.contains("name=\"text\""));
    }

    #[test]
    fn alert_lines_carry_warning_class() {
        let mut telemetry = Telemetry::new(reading(35.0), 15, 3);
        telemetry.alerts.merge(vec!["one".to_string(), "two".to_string()]);
        let panel = render_alerts(&telemetry);
        assert_eq!(panel.matches("<p class=\"alert\">").count(), 2);
        assert!(!panel.contains("class=\"stable\""));
    }

    #[test]
    fn escape_covers_markup() {
        assert_eq!(html_escape(r#"<a href="x">&</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }
}
