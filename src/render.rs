use crate::table::Record;
use crate::types::SENTINEL;
use serde::Serialize;
use tera::{Context, Tera};

const VIEW_TEMPLATE: &str = "view.html";

pub const INDEX_HTML: &str = r#"
    <h1>Vehicle API is Running</h1>
    <p>Use the following endpoints:</p>
    <ul>
        <li><code>/search?regno=YOUR_REGNO</code> - To get raw JSON data.</li>
        <li><code>/view?regno=YOUR_REGNO</code> - To get a clean HTML view.</li>
    </ul>
    "#;

#[derive(Debug, Serialize)]
struct Field {
    heading: String,
    value: String,
}

/// Renders the vehicle detail page. Built once at startup.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    pub fn new() -> Result<Renderer, failure::Error> {
        let mut tera = Tera::default();
        tera.set_escape_fn(escape_html);
        tera.add_raw_template(VIEW_TEMPLATE, include_str!("../templates/view.html"))?;
        Ok(Renderer { tera })
    }

    pub fn view(&self, record: Option<Record<'_>>) -> Result<String, failure::Error> {
        let mut context = Context::new();
        match record {
            Some(record) => {
                let fields: Vec<Field> = record
                    .fields()
                    .map(|(column, cell)| Field {
                        heading: heading(column),
                        value: display_value(&cell.to_string()),
                    })
                    .collect();
                context.insert("regno", &record.regno());
                context.insert("fields", &fields);
            }
            None => {
                context.insert("regno", "Not Found");
                context.insert("fields", &Vec::<Field>::new());
            }
        }
        Ok(self.tera.render(VIEW_TEMPLATE, &context)?)
    }
}

/// `owner_name` becomes `Owner Name`: underscores to spaces, then each run of
/// letters capitalized.
fn heading(column: &str) -> String {
    let mut out = String::with_capacity(column.len());
    let mut in_word = false;
    for ch in column.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

/// Escapes markup characters, leaving `/` alone so `N/A` renders verbatim.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn display_value(value: &str) -> String {
    match value {
        "NaN" | "nan" => SENTINEL.to_string(),
        v => v.to_string(),
    }
}
