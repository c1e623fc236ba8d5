//! Server-rendered HTML for the board

use crate::inventory::{ItemForm, Phase, Snapshot};
use crate::store::LostItem;
use crate::upload::placeholder_url;
use crate::util::time::long_date;

const TITLE: &str = "School Lost &amp; Found";

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; background: #f3f4f6; margin: 0; padding: 2rem; }
main { max-width: 72rem; margin: 0 auto; background: #fff; border-radius: .75rem; padding: 1.5rem; box-shadow: 0 4px 16px rgba(0,0,0,.08); }
header { display: flex; justify-content: space-between; align-items: center; }
table { width: 100%; border-collapse: collapse; }
th, td { text-align: left; padding: .5rem; border-bottom: 1px solid #e5e7eb; vertical-align: top; }
tbody tr:nth-child(even) { background: #f9fafb; }
td img { width: 6rem; height: 6rem; object-fit: cover; border-radius: .5rem; }
dialog form { display: grid; gap: .75rem; min-width: 24rem; }
label { font-weight: 600; display: grid; gap: .25rem; }
.empty, .loading { text-align: center; color: #6b7280; padding: 3rem 0; }
.setup code { background: #f3f4f6; padding: .125rem .5rem; border-radius: .25rem; }
.preview img { width: 6rem; height: 6rem; object-fit: cover; }
"#;

/// Everything the inventory page shows besides the stored items
pub struct PageView<'a> {
    pub snapshot: &'a Snapshot,
    pub form: &'a ItemForm,
    pub dialog_open: bool,
    pub notice: Option<&'a str>,
}

/// Minimal HTML escaping for text and attribute values
pub fn escape(text: &str) -> String {
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

fn layout(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{TITLE}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<main>\n{body}</main>\n</body>\n</html>\n"
    )
}

pub fn render_page(view: &PageView<'_>) -> String {
    if view.snapshot.phase == Phase::Unconfigured {
        return render_setup();
    }

    let mut body = String::new();
    body.push_str(&render_header(view.snapshot.processing));
    body.push_str(&render_dialog(view));
    body.push_str(&render_items(view.snapshot));
    if let Some(notice) = view.notice {
        body.push_str(&render_notice(notice));
    }
    layout(&body)
}

/// Instructions shown when the store is not configured
pub fn render_setup() -> String {
    layout(concat!(
        "<header><div><h1>School Lost &amp; Found</h1>",
        "<p>Help found items get back to their owners</p></div></header>\n",
        "<section class=\"setup\">\n<h2>Almost ready</h2>\n",
        "<p>Set these environment variables to connect the database:</p>\n",
        "<ul><li><code>SUPABASE_URL</code></li><li><code>SUPABASE_ANON_KEY</code></li></ul>\n",
        "<p>After configuring them, run the SQL script that creates the ",
        "<code>lost_items</code> table.</p>\n</section>\n",
    ))
}

fn disabled(processing: bool) -> &'static str {
    if processing {
        " disabled"
    } else {
        ""
    }
}

fn render_header(processing: bool) -> String {
    format!(
        "<header><div><h1>{TITLE}</h1><p>Help found items get back to their owners</p></div>\n\
         <button type=\"button\" onclick=\"document.getElementById('add-item').showModal()\"{}>\
         + Add found item</button></header>\n",
        disabled(processing)
    )
}

fn text_input(id: &str, label: &str, value: &str, placeholder: &str) -> String {
    format!(
        "<label for=\"{id}\">{label}<input id=\"{id}\" name=\"{id}\" value=\"{}\" \
         placeholder=\"{placeholder}\" required></label>\n",
        escape(value)
    )
}

fn render_dialog(view: &PageView<'_>) -> String {
    let form = view.form;
    let processing = view.snapshot.processing;

    let mut html = format!(
        "<dialog id=\"add-item\"{}>\n<h2>Add found item</h2>\n\
         <form method=\"post\" action=\"/items\" enctype=\"multipart/form-data\">\n",
        if view.dialog_open { " open" } else { "" }
    );
    html.push_str(&text_input("student_id", "Student ID", &form.student_id, "e.g. 06211"));
    html.push_str(&text_input("name", "Item name", &form.name, "e.g. red bag, mobile phone"));
    html.push_str(&format!(
        "<label for=\"description\">Description<textarea id=\"description\" name=\"description\" \
         placeholder=\"Describe the item in detail\" required>{}</textarea></label>\n",
        escape(&form.description)
    ));
    html.push_str(&text_input(
        "location",
        "Where it was found",
        &form.location,
        "e.g. library, sports field, cafeteria",
    ));
    html.push_str(&format!(
        "<label for=\"date_found\">Date found<input type=\"date\" id=\"date_found\" \
         name=\"date_found\" value=\"{}\" required></label>\n",
        escape(&form.date_found)
    ));
    // Ahead of the file input so a newly chosen file is read after it
    if let Some(image) = &form.image_data {
        html.push_str(&format!(
            "<input type=\"hidden\" name=\"image_data\" value=\"{}\">\n",
            escape(image)
        ));
    }
    html.push_str(&format!(
        "<label for=\"image\">Upload image<input type=\"file\" id=\"image\" name=\"image\" \
         accept=\"image/*\"{}></label>\n",
        disabled(processing)
    ));

    if processing {
        html.push_str("<p>Processing image...</p>\n");
    } else if let Some(image) = &form.image_data {
        html.push_str(&format!(
            "<div class=\"preview\"><p>Image preview</p>\
             <img src=\"{}\" alt=\"Image preview\"></div>\n",
            escape(image)
        ));
    }

    html.push_str(&format!(
        "<button type=\"submit\"{}>{}</button>\n</form>\n</dialog>\n",
        disabled(processing),
        if processing { "Adding..." } else { "Add item" }
    ));
    html
}

fn image_src(item: &LostItem) -> String {
    match &item.image_data {
        Some(data) if !data.is_empty() => data.clone(),
        _ => placeholder_url(&item.name, 96).unwrap_or_else(|_| "/placeholder.svg".to_string()),
    }
}

fn render_items(snapshot: &Snapshot) -> String {
    if snapshot.phase == Phase::Loading {
        return "<p class=\"loading\">Loading items...</p>\n".to_string();
    }
    if snapshot.items.is_empty() {
        return concat!(
            "<div class=\"empty\"><h3>No lost items yet</h3>",
            "<p>Add the first item to help your schoolmates!</p></div>\n"
        )
        .to_string();
    }

    let mut html = format!(
        "<h3>Found items ({} items)</h3>\n<table>\n<thead><tr><th>Image</th><th>Item</th>\
         <th>Description</th><th>Found at</th><th>Date found</th></tr></thead>\n<tbody>\n",
        snapshot.items.len()
    );
    for item in &snapshot.items {
        html.push_str(&format!(
            "<tr><td><img src=\"{}\" alt=\"Image of {}\"></td><td><strong>{}</strong></td>\
             <td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(&image_src(item)),
            escape(&item.name),
            escape(&item.name),
            escape(&item.description),
            escape(&item.location),
            long_date(item.date_found),
        ));
    }
    html.push_str("</tbody>\n</table>\n");
    html
}

/// Blocking notice the user has to acknowledge
fn render_notice(notice: &str) -> String {
    format!(
        "<dialog id=\"notice\" role=\"alertdialog\"><p>{}</p>\
         <form method=\"dialog\"><button>OK</button></form></dialog>\n\
         <script>document.getElementById('notice').showModal();</script>\n",
        escape(notice)
    )
}

/// Simple labelled placeholder image
pub fn render_placeholder_svg(width: u32, height: u32, label: &str) -> String {
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" \
         viewBox=\"0 0 {width} {height}\"><rect width=\"100%\" height=\"100%\" fill=\"#e5e7eb\"/>\
         <text x=\"50%\" y=\"50%\" font-family=\"sans-serif\" font-size=\"10\" fill=\"#6b7280\" \
         text-anchor=\"middle\" dominant-baseline=\"middle\">{}</text></svg>",
        escape(label)
    )
}
