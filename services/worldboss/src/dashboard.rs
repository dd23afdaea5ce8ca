//! Web dashboard with the boss board, automation controls and JSON endpoints

use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::automation::{AutomationController, AutomationStatus};
use crate::boss::BossSnapshot;
use crate::state::StateHandle;

const DEFAULT_ICON: &str = "https://web.simple-mmo.com/img/sprites/3.png";

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub state: StateHandle,
    pub automation: AutomationController,
}

#[derive(Debug, Serialize)]
struct StartResponse {
    started: bool,
    #[serde(flatten)]
    status: AutomationStatus,
}

#[derive(Debug, Serialize)]
struct StopResponse {
    stopped: bool,
    #[serde(flatten)]
    status: AutomationStatus,
}

/// Build the dashboard axum router
pub fn build_router(state: StateHandle, automation: AutomationController) -> Router {
    let dashboard_state = DashboardState { state, automation };

    Router::new()
        .route("/", get(index_handler))
        .route("/scraping/start", post(start_handler))
        .route("/scraping/stop", post(stop_handler))
        .route("/scraping/status", get(status_handler))
        .route("/api/bosses", get(bosses_handler))
        .route("/api/history", get(history_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(dashboard_state)
}

async fn index_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let board = dashboard.state.read().await.board();

    let Some(next) = board.next_boss() else {
        return Html("<h1>Chargement des boss…</h1>".to_string());
    };

    let other_cards: String = board
        .bosses
        .iter()
        .skip(1)
        .map(|b| {
            format!(
                r#"<div style="background: #111827; border: 1px solid rgba(255,255,255,.05); border-radius: 12px; padding: 14px; display: grid; grid-template-columns: auto 1fr; gap: 12px; align-items: center;">
                    {avatar}
                    <div>
                        <div style="font-size: 16px; font-weight: 700;">{name}</div>
                        {meta}
                        <div style="margin-top: 4px; color: #9ca3af; font-size: 13px;">{stats}</div>
                        <div style="margin-top: 4px; color: #c7d2fe; font-size: 13px;">Spawn prévu : {spawn} (ETA)</div>
                    </div>
                </div>"#,
                avatar = avatar(b, 52),
                name = escape_html(&b.name),
                meta = meta(b),
                stats = stats_line(b),
                spawn = b.spawn_at_local.as_deref().unwrap_or("?"),
            )
        })
        .collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>World Bosses</title>
    <link rel="icon" href="https://web.simple-mmo.com/img/simplemmo-trans.png">
</head>
<body style="margin: 0; font-family: 'Segoe UI', system-ui, sans-serif; background: #0f172a; color: #e5e7eb;">
    <div style="max-width: 1080px; margin: 0 auto; padding: 24px 16px 32px;">
        <h1 style="margin: 0 0 16px; font-size: 28px;">World Bosses</h1>
        <div style="border: 1px solid rgba(124,58,237,.4); background: rgba(124,58,237,.12); border-radius: 14px; padding: 18px; display: grid; grid-template-columns: auto 1fr auto; gap: 14px; align-items: center;">
            {next_avatar}
            <div>
                <div style="font-size: 20px; font-weight: 700;">{next_name}</div>
                {next_meta}
                <div style="margin-top: 4px; color: #9ca3af; font-size: 13px;">{next_stats}</div>
                <div style="margin-top: 4px; color: #c7d2fe; font-size: 13px;">Spawn prévu : {next_spawn} (ETA)</div>
            </div>
            <div><span style="padding: 3px 8px; border-radius: 8px; background: rgba(34,211,238,.12); color: #67e8f9; font-size: 12px; font-weight: 600;">Prochain</span></div>
        </div>
        <div style="display: flex; gap: 10px; align-items: center; margin-top: 12px; flex-wrap: wrap;">
            <button id="btn-start" style="background: #7c3aed; color: #fff; border: none; padding: 8px 14px; border-radius: 10px; cursor: pointer; font-weight: 700;">Activer la fonction</button>
            <button id="btn-stop" style="background: #1f2937; color: #e5e7eb; border: 1px solid rgba(255,255,255,.12); padding: 8px 14px; border-radius: 10px; cursor: pointer; font-weight: 700;">Désactiver la fonction</button>
            <span id="exp-status" style="font-size: 13px; color: #9ca3af;">Statut : chargement…</span>
        </div>
        <p>Ceci est la fonction pour les quêtes automatiques.</p>
        <h2 style="margin: 0 0 12px; font-size: 18px; color: #9ca3af;">Autres boss</h2>
        <div style="display: grid; gap: 14px; grid-template-columns: repeat(auto-fit, minmax(240px, 1fr));">{other_cards}</div>
        <div style="margin-top: 18px; color: #9ca3af; font-size: 13px; text-align: right;">Dernière mise à jour : {last_update}</div>
    </div>
    <script>
        async function updateStatus() {{
            try {{
                const res = await fetch('/scraping/status');
                const data = await res.json();
                const active = data.active ? 'Active' : 'Inactive';
                const last = data.last_click ? `Dernier clic : ${{data.last_click}}` : '';
                const err = data.last_error ? `Erreur : ${{data.last_error}}` : '';
                document.getElementById('exp-status').textContent = `Statut : ${{active}} ${{last}} ${{err}}`.trim();
            }} catch (e) {{
                document.getElementById('exp-status').textContent = 'Statut : erreur';
            }}
        }}

        async function callEndpoint(url) {{
            await fetch(url, {{ method: 'POST' }});
            await updateStatus();
        }}

        document.getElementById('btn-start').addEventListener('click', () => callEndpoint('/scraping/start'));
        document.getElementById('btn-stop').addEventListener('click', () => callEndpoint('/scraping/stop'));

        updateStatus();
        setInterval(updateStatus, 15000);
    </script>
</body>
</html>"#,
        next_avatar = avatar(next, 72),
        next_name = escape_html(&next.name),
        next_meta = meta(next),
        next_stats = stats_line(next),
        next_spawn = next.spawn_at_local.as_deref().unwrap_or("En cours"),
        other_cards = other_cards,
        last_update = board.last_update.as_deref().unwrap_or("..."),
    );

    Html(html)
}

async fn start_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let started = dashboard.automation.start().await;
    let status = dashboard.automation.status().await;
    Json(StartResponse { started, status })
}

async fn stop_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let stopped = dashboard.automation.stop().await;
    let status = dashboard.automation.status().await;
    Json(StopResponse { stopped, status })
}

async fn status_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    Json(dashboard.automation.status().await)
}

async fn bosses_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let board = dashboard.state.read().await.board();
    Json(serde_json::json!({
        "bosses": board.bosses,
        "last_update": board.last_update,
    }))
}

async fn history_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;
    let history: Vec<_> = state.history.iter().cloned().collect();
    Json(history)
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}

fn avatar(boss: &BossSnapshot, size: u32) -> String {
    let src = boss.icon_url.as_deref().unwrap_or(DEFAULT_ICON);
    format!(
        r#"<div><img src="{}" alt="icon" style="width: {size}px; height: {size}px; object-fit: contain;"></div>"#,
        escape_html(src)
    )
}

fn meta(boss: &BossSnapshot) -> String {
    format!(
        r#"<div style="display: flex; gap: 10px; flex-wrap: wrap; margin-top: 4px; color: #9ca3af; font-size: 14px;">
                    <span style="padding: 4px 10px; border-radius: 999px; background: rgba(124,58,237,.15); color: #c4b5fd; font-size: 13px; font-weight: 600;">Niveau {}</span>
                    <span style="color: #a5f3fc; font-weight: 600;">ETA {}</span>
                </div>"#,
        escape_html(&boss.level_label),
        escape_html(&boss.eta_label)
    )
}

fn stats_line(boss: &BossSnapshot) -> String {
    let stats = &boss.stats;
    format!(
        "HP {} · STR {} · DEX {} · DEF {}",
        format_number(stats.hp),
        format_number(stats.strength),
        format_number(stats.dexterity),
        format_number(stats.defence)
    )
}

/// Group digits by thousands with spaces, `?` when unknown
fn format_number(value: Option<u64>) -> String {
    let Some(value) = value else {
        return "?".to_string();
    };
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
