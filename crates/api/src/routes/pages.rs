//! Server-rendered page shells.
//!
//! Each page is static HTML whose script reads the session token from
//! `localStorage` and renders data fetched from the JSON API.

use axum::response::{Html, Redirect};

/// One navigable screen.
struct Page {
    path: &'static str,
    title: &'static str,
    /// API endpoint the page script loads.
    endpoint: &'static str,
    /// Script body; receives the parsed JSON as `data`.
    render: &'static str,
}

const NAV: [(&str, &str); 7] = [
    ("/admin-dashboard", "ダッシュボード"),
    ("/clients", "顧問先"),
    ("/projects", "プロジェクト"),
    ("/subsidies", "助成金申請"),
    ("/subsidy-master", "助成金マスタ"),
    ("/calendar", "カレンダー"),
    ("/gmail", "メール"),
];

const STYLE: &str = "body{font-family:sans-serif;margin:0;color:#222}\
nav{background:#1f3a5f;padding:8px 16px}\
nav a{color:#fff;margin-right:16px;text-decoration:none}\
nav a.active{font-weight:bold;text-decoration:underline}\
main{padding:16px}\
table{border-collapse:collapse;width:100%}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:left}\
.error{color:#b00020}";

const DASHBOARD: Page = Page {
    path: "/admin-dashboard",
    title: "ダッシュボード",
    endpoint: "/api/subsidies/applications/alerts",
    render: r#"
      const rows = data.map(a => `<tr><td>${esc(a.client_name)}</td><td>${esc(a.subsidy_name)}</td>
        <td>${esc(a.submission_deadline)}</td><td>${a.days_remaining}</td><td>${esc(a.level)}</td></tr>`);
      return `<h2>申請期限アラート</h2><table><tr><th>顧問先</th><th>助成金</th><th>期限</th><th>残日数</th><th>レベル</th></tr>${rows.join('')}</table>`;
    "#,
};

const CLIENTS: Page = Page {
    path: "/clients",
    title: "顧問先",
    endpoint: "/api/clients",
    render: r#"
      const rows = data.items.map(c => `<tr><td>${c.id}</td><td>${esc(c.name)}</td>
        <td>${esc(c.contact_person)}</td><td>${esc(c.email)}</td><td>${c.employee_count}</td></tr>`);
      return `<table><tr><th>ID</th><th>名称</th><th>担当者</th><th>メール</th><th>従業員数</th></tr>${rows.join('')}</table>`;
    "#,
};

const PROJECTS: Page = Page {
    path: "/projects",
    title: "プロジェクト",
    endpoint: "/api/projects",
    render: r#"
      const rows = data.map(p => `<tr><td>${p.id}</td><td>${esc(p.name)}</td><td>${esc(p.status)}</td>
        <td>${esc(p.start_date)}</td><td>${esc(p.end_date)}</td></tr>`);
      return `<table><tr><th>ID</th><th>名称</th><th>状態</th><th>開始</th><th>終了</th></tr>${rows.join('')}</table>`;
    "#,
};

const SUBSIDIES: Page = Page {
    path: "/subsidies",
    title: "助成金申請",
    endpoint: "/api/subsidies/applications",
    render: r#"
      const rows = data.map(a => `<tr><td>${esc(a.application_number)}</td><td>${esc(a.client_name)}</td>
        <td>${esc(a.subsidy_name)}</td><td>${esc(a.status)}</td><td>${a.progress}%</td></tr>`);
      return `<table><tr><th>申請番号</th><th>顧問先</th><th>助成金</th><th>状態</th><th>進捗</th></tr>${rows.join('')}</table>`;
    "#,
};

const SUBSIDY_MASTER: Page = Page {
    path: "/subsidy-master",
    title: "助成金マスタ",
    endpoint: "/api/subsidies",
    render: r#"
      const rows = data.map(s => `<tr><td>${s.id}</td><td>${esc(s.name)}</td><td>${esc(s.category)}</td>
        <td>${s.max_amount ?? ''}</td><td>${s.is_active ? '有効' : '無効'}</td></tr>`);
      return `<table><tr><th>ID</th><th>名称</th><th>区分</th><th>上限額</th><th>状態</th></tr>${rows.join('')}</table>`;
    "#,
};

const CALENDAR: Page = Page {
    path: "/calendar",
    title: "カレンダー",
    endpoint: "/api/calendar/events",
    render: r#"
      const rows = data.map(e => `<tr><td>${esc((e.start||{}).dateTime || (e.start||{}).date)}</td>
        <td>${esc(e.summary)}</td></tr>`);
      return `<table><tr><th>開始</th><th>件名</th></tr>${rows.join('')}</table>`;
    "#,
};

const GMAIL: Page = Page {
    path: "/gmail",
    title: "メール",
    endpoint: "/api/gmail/messages?max_results=20",
    render: r#"
      const rows = (data.messages || []).map(m => `<tr><td>${esc(m.id)}</td>
        <td><button onclick="toTask('${esc(m.id)}')">タスク化</button></td></tr>`);
      return `<table><tr><th>メッセージ</th><th></th></tr>${rows.join('')}</table>`;
    "#,
};

fn render(page: &Page) -> Html<String> {
    let nav: String = NAV
        .iter()
        .map(|(path, label)| {
            let class = if *path == page.path { " class=\"active\"" } else { "" };
            format!("<a href=\"{}\"{}>{}</a>", path, class, label)
        })
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="ja">
<head>
<meta charset="utf-8">
<title>{title} | 社労士事務所</title>
<style>{style}</style>
</head>
<body>
<nav>{nav}</nav>
<main>
<h1>{title}</h1>
<div id="content">読み込み中...</div>
</main>
<script>
const token = localStorage.getItem('token');
const headers = token ? {{ 'Authorization': 'Bearer ' + token }} : {{}};
function esc(v) {{
  return String(v ?? '').replace(/[&<>"']/g, c => ({{'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;',"'":'&#39;'}})[c]);
}}
async function toTask(id) {{
  const res = await fetch('/api/gmail/messages/' + encodeURIComponent(id) + '/to-task', {{ method: 'POST', headers }});
  const body = await res.json();
  alert(body.message);
}}
function view(data) {{ {render} }}
fetch('{endpoint}', {{ headers }})
  .then(async res => {{
    const body = await res.json();
    if (!res.ok) throw new Error(body.message || res.statusText);
    document.getElementById('content').innerHTML = view(body);
  }})
  .catch(err => {{
    document.getElementById('content').innerHTML = '<p class="error">' + esc(err.message) + '</p>';
  }});
</script>
</body>
</html>"#,
        title = page.title,
        style = STYLE,
        nav = nav,
        render = page.render,
        endpoint = page.endpoint,
    ))
}

/// GET /
pub async fn root_redirect() -> Redirect {
    Redirect::temporary(DASHBOARD.path)
}

pub async fn admin_dashboard() -> Html<String> {
    render(&DASHBOARD)
}

pub async fn clients() -> Html<String> {
    render(&CLIENTS)
}

pub async fn projects() -> Html<String> {
    render(&PROJECTS)
}

pub async fn subsidies() -> Html<String> {
    render(&SUBSIDIES)
}

pub async fn subsidy_master() -> Html<String> {
    render(&SUBSIDY_MASTER)
}

pub async fn calendar() -> Html<String> {
    render(&CALENDAR)
}

pub async fn gmail() -> Html<String> {
    render(&GMAIL)
}
