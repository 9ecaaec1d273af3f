use std::fmt::Write as _;

use async_trait::async_trait;
use server_api::ViewRenderer;
use shared::domain::{Citizen, Identity};
use storage::StoreHandle;

pub const STORE_UNAVAILABLE_MESSAGE: &str = "Błąd połączenia z bazą danych";

/// The citizen list page shown for every request that is not an action.
pub struct CitizensPage;

#[async_trait]
impl ViewRenderer for CitizensPage {
    async fn render(&self, store: &mut StoreHandle, viewer: &Identity) -> anyhow::Result<String> {
        let citizens = store.list_citizens().await?;
        Ok(citizens_page(viewer, &citizens))
    }
}

pub fn citizens_page(viewer: &Identity, citizens: &[Citizen]) -> String {
    let mut rows = String::new();
    for citizen in citizens {
        let _ = write!(
            rows,
            r#"<tr data-citizen-id="{id}"><td>{first}</td><td>{last}</td><td>{birth}</td><td>{pesel}</td><td>{phone}</td></tr>"#,
            id = citizen.citizen_id.0,
            first = escape(&citizen.first_name),
            last = escape(&citizen.last_name),
            birth = escape(citizen.birth_date.as_deref().unwrap_or("-")),
            pesel = escape(citizen.pesel.as_deref().unwrap_or("-")),
            phone = escape(citizen.phone.as_deref().unwrap_or("-")),
        );
    }
    if citizens.is_empty() {
        rows.push_str(r#"<tr class="empty"><td colspan="5">Brak obywateli w bazie</td></tr>"#);
    }

    let admin_badge = if viewer.is_admin {
        r#"<span class="badge admin">Administrator</span>"#
    } else {
        ""
    };
    let delete_modal = if viewer.is_admin {
        r#"<div class="modal" id="delete-modal" hidden><p>Czy na pewno chcesz usunąć ten wpis?</p><button data-confirm>Usuń</button><button data-close>Anuluj</button></div>"#
    } else {
        ""
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="pl">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Obywatele - Police Tablet</title>
</head>
<body data-admin="{is_admin}">
<header><h1>Police Tablet</h1></header>
<nav>
<span class="user">{username}</span>{admin_badge}
<form method="post" action="/logout"><button type="submit">Wyloguj</button></form>
</nav>
<main class="container">
<table id="citizens">
<thead><tr><th>Imię</th><th>Nazwisko</th><th>Data urodzenia</th><th>PESEL</th><th>Telefon</th></tr></thead>
<tbody>{rows}</tbody>
</table>
</main>
<div class="modal" id="citizen-details-modal" hidden></div>
<div class="modal" id="verdict-modal" hidden></div>
<div class="modal" id="wanted-modal" hidden></div>
<div class="modal" id="note-modal" hidden></div>
{delete_modal}
</body>
</html>"#,
        is_admin = viewer.is_admin,
        username = escape(&viewer.username),
    )
}

pub fn login_page(error: Option<&str>, action: &str) -> String {
    let error = error
        .map(|message| format!(r#"<p class="error">{}</p>"#, escape(message)))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html lang="pl">
<head><meta charset="UTF-8"><title>Logowanie - Police Tablet</title></head>
<body>
<main class="login">
<h1>Logowanie</h1>
{error}
<form method="post" action="{action}">
<label>Login <input name="username" autocomplete="username" required></label>
<label>Hasło <input name="password" type="password" autocomplete="current-password" required></label>
<button type="submit">Zaloguj</button>
</form>
</main>
</body>
</html>"#,
        action = escape(action),
    )
}

pub fn error_page() -> String {
    r#"<!DOCTYPE html>
<html lang="pl"><head><meta charset="UTF-8"><title>Błąd - Police Tablet</title></head>
<body><p>Nie udało się wyświetlić strony. Spróbuj ponownie później.</p></body></html>"#
        .to_string()
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
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
