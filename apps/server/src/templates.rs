// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTML pages rendered with handlebars.

use axum::response::{Html, IntoResponse, Response};
use handlebars::Handlebars;
use serde_json::{json, Value};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::flash::{Flash, IncomingFlash};

const PAGES: [(&str, &str); 5] = [
    ("index", include_str!("../templates/index.hbs")),
    ("login", include_str!("../templates/login.hbs")),
    ("register", include_str!("../templates/register.hbs")),
    ("history", include_str!("../templates/history.hbs")),
    ("preview", include_str!("../templates/preview.hbs")),
];

/// Compiled page templates.
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, handlebars::TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_partial("layout", include_str!("../templates/layout.hbs"))?;
        for (name, source) in PAGES {
            registry.register_template_string(name, source)?;
        }
        Ok(Self { registry })
    }

    /// Render a page inside the layout.
    ///
    /// `data` must be a JSON object; the signed-in user, CSRF token and a
    /// pending flash message are merged into it.
    pub fn page(
        &self,
        name: &str,
        title: &str,
        user: Option<&CurrentUser>,
        flash: &IncomingFlash,
        extra_flash: Option<Flash>,
        data: Value,
    ) -> Result<Response, ApiError> {
        let mut context = match data {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        context.insert("title".into(), json!(title));
        context.insert(
            "user".into(),
            json!(user.map(|u| json!({ "id": u.user_id, "username": u.username }))),
        );
        context.insert("csrf_token".into(), json!(user.map(|u| &u.csrf_token)));
        context.insert("flash".into(), json!(extra_flash.or_else(|| flash.0.clone())));

        let html = self.registry.render(name, &Value::Object(context))?;
        let mut response = Html(html).into_response();
        flash.consume(&mut response);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_compile_and_render() {
        let templates = Templates::new().unwrap();
        let flash = IncomingFlash(Some(Flash::error("メールアドレスが正しくありません")));
        let response = templates
            .page("login", "ログイン", None, &flash, None, json!({ "form": {} }))
            .unwrap();
        assert!(response
            .headers()
            .get_all(axum::http::header::SET_COOKIE)
            .iter()
            .any(|v| v.to_str().unwrap().starts_with("flash=;")));
    }

    #[test]
    fn test_layout_carries_csrf_meta() {
        let templates = Templates::new().unwrap();
        let user = CurrentUser {
            user_id: 1,
            username: "taro".into(),
            session_id: "s".into(),
            csrf_token: "tok123".into(),
        };
        let html = templates
            .registry
            .render(
                "index",
                &json!({ "title": "t", "user": { "username": "taro" }, "csrf_token": user.csrf_token }),
            )
            .unwrap();
        assert!(html.contains(r#"<meta name="csrf-token" content="tok123">"#));
        assert!(html.contains("uploadForm"));
    }
}
