//! Server-rendered HTML pages, one per workflow.
use std::fmt::Write as _;

use crate::palette;
use crate::workflows::multicolor::{DetectedColors, Recolored};
use crate::workflows::object_change::ReplacedAccessory;
use crate::workflows::product_color::ColorBatch;
use crate::workflows::product_replace::SetupAnalysis;

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body><nav><a href=\"/\">Dashboard</a></nav><h1>{title}</h1>\n{body}</body></html>\n",
        title = escape(title),
        body = body
    )
}

fn output_img(filename: &str, ts: Option<u64>) -> String {
    let src = match ts {
        Some(ts) => format!("/static/output/{}?v={}", escape(filename), ts),
        None => format!("/static/output/{}", escape(filename)),
    };
    format!("<figure><img src=\"{src}\" alt=\"result\"><figcaption><a href=\"{src}\" download>Download</a></figcaption></figure>\n")
}

pub fn index() -> String {
    let links = [
        ("/background", "Wall replacement"),
        ("/flooring", "Floor replacement"),
        ("/product-color", "Fabric color"),
        ("/multi-color", "Multi color"),
        ("/object-change", "Accessory swap"),
        ("/product-replace", "Product replace"),
    ];
    let mut body = String::from("<ul>\n");
    for (href, label) in links {
        let _ = writeln!(body, "<li><a href=\"{}\">{}</a></li>", href, label);
    }
    body.push_str("</ul>\n");
    layout("Product Studio", &body)
}

fn surface_page(title: &str, action: &str, texture_field: &str, texture_label: &str, output: Option<&str>) -> String {
    let mut body = format!(
        "<form method=\"post\" action=\"{action}\" enctype=\"multipart/form-data\">\n\
         <label>Room photo <input type=\"file\" name=\"target_image\" accept=\"image/*\" required></label>\n\
         <label>{texture_label} <input type=\"file\" name=\"{texture_field}\" accept=\"image/*\" required></label>\n\
         <button type=\"submit\">Replace</button>\n</form>\n"
    );
    if let Some(name) = output {
        body.push_str(&output_img(name, None));
    }
    layout(title, &body)
}

pub fn background(output: Option<&str>) -> String {
    surface_page("Wall replacement", "/background", "wall_image", "Wall texture", output)
}

pub fn flooring(output: Option<&str>) -> String {
    surface_page("Floor replacement", "/flooring", "floor_image", "Floor texture", output)
}

pub fn product_color(batch: Option<&ColorBatch>) -> String {
    let mut body = String::from(
        "<form method=\"post\" action=\"/product-color\" enctype=\"multipart/form-data\">\n\
         <label>Product photo <input type=\"file\" name=\"target_image\" accept=\"image/*\" required></label>\n\
         <label>Fabric region <input type=\"text\" name=\"color_target\" value=\"product\"></label>\n<fieldset>\n",
    );
    for name in palette::color_names() {
        let _ = writeln!(
            body,
            "<label><input type=\"checkbox\" name=\"colors\" value=\"{0}\"> {0}</label>",
            escape(name)
        );
    }
    body.push_str("</fieldset>\n<button type=\"submit\">Recolor</button>\n</form>\n");
    if let Some(batch) = batch {
        for r in &batch.results {
            let _ = writeln!(body, "<h2>{}</h2>", escape(&r.label));
            body.push_str(&output_img(&r.filename, Some(batch.ts)));
        }
    }
    layout("Fabric color", &body)
}

pub fn multicolor(detected: Option<&DetectedColors>, recolored: Option<&Recolored>) -> String {
    let mut body = String::from(
        "<form method=\"post\" action=\"/multi-color\" enctype=\"multipart/form-data\">\n\
         <label>Product photo <input type=\"file\" name=\"multicolor_image\" accept=\"image/*\" required></label>\n\
         <button type=\"submit\">Detect colors</button>\n</form>\n",
    );
    if let Some(d) = detected {
        body.push_str(&output_img(&d.filename, Some(d.ts)));
        body.push_str(
            "<form method=\"post\" action=\"/modify-detected-color\" enctype=\"multipart/form-data\">\n\
             <label>Change <select name=\"source_color\">\n",
        );
        for c in &d.colors {
            let _ = writeln!(body, "<option value=\"{0}\">{0}</option>", escape(c));
        }
        let _ = write!(
            body,
            "</select></label>\n<label>to <input type=\"text\" name=\"target_color\" required></label>\n\
             <input type=\"hidden\" name=\"filename\" value=\"{}\">\n\
             <button type=\"submit\">Apply</button>\n</form>\n",
            escape(&d.filename)
        );
    }
    if let Some(r) = recolored {
        body.push_str(&output_img(&r.filename, Some(r.ts)));
    }
    layout("Multi color", &body)
}

pub fn object_change(result: Option<&ReplacedAccessory>) -> String {
    let mut body = String::from(
        "<form method=\"post\" action=\"/object-change\" enctype=\"multipart/form-data\">\n\
         <label>Product photo <input type=\"file\" name=\"accessory_image\" accept=\"image/*\" required></label>\n\
         <label>New accessory <input type=\"text\" name=\"new_accessory\" required></label>\n\
         <button type=\"submit\">Replace</button>\n</form>\n",
    );
    if let Some(r) = result {
        body.push_str(&output_img(&r.filename, Some(r.ts)));
    }
    layout("Accessory swap", &body)
}

pub fn product_replace(analysis: Option<&SetupAnalysis>, output_b64: Option<&str>) -> String {
    let mut body = String::from(
        "<form method=\"post\" action=\"/product-replace\" enctype=\"multipart/form-data\">\n\
         <label>Setup photo <input type=\"file\" name=\"setup\" accept=\"image/*\" required></label>\n\
         <button type=\"submit\">Analyze</button>\n</form>\n",
    );
    if let Some(a) = analysis {
        let _ = write!(
            body,
            "<form method=\"post\" action=\"/product-replace/replace\" enctype=\"multipart/form-data\">\n\
             <input type=\"hidden\" name=\"setup_path\" value=\"{}\">\n<table>\n",
            escape(&a.setup_path)
        );
        for (i, item) in a.items.iter().enumerate() {
            let item = escape(item);
            let _ = writeln!(
                body,
                "<tr><td><label><input type=\"checkbox\" name=\"selected_items\" value=\"{item}\"> {item}</label>\
                 <input type=\"hidden\" name=\"item_key_{i}\" value=\"{item}\"></td>\
                 <td><input type=\"file\" name=\"product_{i}\" accept=\"image/*\"></td></tr>"
            );
        }
        body.push_str("</table>\n<button type=\"submit\">Replace selected</button>\n</form>\n");
    }
    if let Some(b64) = output_b64 {
        let _ = writeln!(body, "<figure><img src=\"data:image/png;base64,{}\" alt=\"result\"></figure>", b64);
    }
    layout("Product replace", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::product_color::ColorResult;

    #[test]
    fn escape_covers_html_metacharacters() {
        assert_eq!(escape("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn product_color_lists_the_palette_and_results() {
        let batch = ColorBatch {
            results: vec![ColorResult { label: "Product → Oatmeal".into(), filename: "product_Oatmeal_1_a.png".into() }],
            ts: 1,
        };
        let html = product_color(Some(&batch));
        assert!(html.contains("value=\"Midnight Green\""));
        assert!(html.contains("/static/output/product_Oatmeal_1_a.png?v=1"));
        assert!(html.contains("Product → Oatmeal"));
    }

    #[test]
    fn product_replace_echoes_setup_and_item_keys() {
        let analysis = SetupAnalysis { items: vec!["Table".into(), "Rug".into()], setup_path: "setup_1_a.png".into() };
        let html = product_replace(Some(&analysis), None);
        assert!(html.contains("name=\"setup_path\" value=\"setup_1_a.png\""));
        assert!(html.contains("name=\"item_key_1\" value=\"Rug\""));
        assert!(html.contains("name=\"product_0\""));
    }

    #[test]
    fn user_text_is_escaped() {
        let detected = DetectedColors { colors: vec!["<b>red</b>".into()], filename: "m.jpg".into(), ts: 3 };
        let html = multicolor(Some(&detected), None);
        assert!(html.contains("&lt;b&gt;red&lt;/b&gt;"));
        assert!(!html.contains("<b>red</b>"));
    }
}
