//! HTML for the jukebox form page.

use crate::queue::{QueueSnapshot, SongRequest};

use super::{Flash, FlashKind};

const STYLE: &str = "\
body{font-family:sans-serif;max-width:40rem;margin:2rem auto;padding:0 1rem}\
.flash{padding:.5rem 1rem;border-radius:4px;margin:.5rem 0}\
.info{background:#e7f1fb}.success{background:#e6f6e6}.danger{background:#fbe7e7}\
label{display:block;margin:.5rem 0}input[type=text]{width:100%}\
table{border-collapse:collapse}td,th{padding:.25rem .75rem;text-align:left}";

/// Escape text for use in HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn flash_class(kind: FlashKind) -> &'static str {
    match kind {
        FlashKind::Info => "info",
        FlashKind::Success => "success",
        FlashKind::Danger => "danger",
    }
}

fn slot_row(name: &str, song: Option<&SongRequest>) -> String {
    match song {
        Some(song) => format!(
            "<tr><th>{name}</th><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&song.song_id),
            song.status.label(),
            escape_html(&song.prompt),
        ),
        None => format!("<tr><th>{name}</th><td colspan=\"3\">empty</td></tr>"),
    }
}

/// Render `GET /`: flashed messages, queue status and the song form.
pub fn render_index(flashes: &[Flash], snapshot: &QueueSnapshot) -> String {
    let mut flash_html = String::new();
    for flash in flashes {
        flash_html.push_str(&format!(
            "<div class=\"flash {}\">{}</div>\n",
            flash_class(flash.kind),
            escape_html(&flash.message)
        ));
    }

    format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>Rowdy Radio</title>
<style>{STYLE}</style>
</head>
<body>
<h1>Rowdy Radio</h1>
{flash_html}<h2>Queue</h2>
<table>
{current}
{next}
</table>
<h2>Request a song</h2>
<form method="post" action="/">
<fieldset>
<legend>Generation Method</legend>
<label><input type="radio" name="method" value="prompt" checked> Prompt</label>
<label><input type="radio" name="method" value="title_tags"> Title and Tags</label>
</fieldset>
<label>Title <input type="text" name="title"></label>
<label>Tags <input type="text" name="tags"></label>
<label>Prompt <input type="text" name="prompt"></label>
<button type="submit"{disabled}>Generate Song</button>
</form>
</body>
</html>
"#,
        current = slot_row("Now", snapshot.current.as_ref()),
        next = slot_row("Next", snapshot.next.as_ref()),
        disabled = if snapshot.full { " disabled" } else { "" },
    )
}
