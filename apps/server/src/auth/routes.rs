// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Register, login and logout endpoints.

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde_json::json;

use super::validation::{validate_login, validate_registration, LoginForm, RegisterForm};
use super::{CurrentUser, FormCsrf, MaybeUser, LOGIN_PATH, SESSION_COOKIE};
use crate::cookies::{self, CookieOptions};
use crate::db::{sessions, users};
use crate::error::ApiError;
use crate::flash::{Flash, IncomingFlash};
use crate::AppState;

fn append_cookie(response: &mut Response, cookie: &str) {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

fn register_form_page(
    state: &AppState,
    csrf: &FormCsrf,
    flash: &IncomingFlash,
    error: Option<Flash>,
    form: &RegisterForm,
    errors: &[String],
) -> Result<Response, ApiError> {
    let mut response = state.templates.page(
        "register",
        "新規登録",
        None,
        flash,
        error,
        json!({ "form": form, "errors": errors, "form_csrf": csrf.token() }),
    )?;
    csrf.attach(&mut response, state.config.cookie_secure);
    Ok(response)
}

fn login_form_page(
    state: &AppState,
    csrf: &FormCsrf,
    flash: &IncomingFlash,
    error: Option<Flash>,
    form: &LoginForm,
) -> Result<Response, ApiError> {
    let mut response = state.templates.page(
        "login",
        "ログイン",
        None,
        flash,
        error,
        json!({ "form": form, "form_csrf": csrf.token() }),
    )?;
    csrf.attach(&mut response, state.config.cookie_secure);
    Ok(response)
}

/// GET /auth/register
pub async fn register_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    csrf: FormCsrf,
    flash: IncomingFlash,
) -> Result<Response, ApiError> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    register_form_page(&state, &csrf, &flash, None, &RegisterForm::default(), &[])
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    csrf: FormCsrf,
    flash: IncomingFlash,
    Form(mut form): Form<RegisterForm>,
) -> Result<Response, ApiError> {
    csrf.verify(form.csrf_token.as_deref())?;
    form.username = form.username.trim().to_string();
    form.email = form.email.trim().to_string();

    let errors = validate_registration(&form);
    if !errors.is_empty() {
        tracing::debug!(errors = errors.len(), "Registration rejected");
        return register_form_page(&state, &csrf, &flash, None, &form, &errors);
    }

    let duplicate = if users::username_taken(&state.pool, &form.username).await? {
        Some(format!("ユーザー名 {} は既に登録されています。", form.username))
    } else if users::email_taken(&state.pool, &form.email).await? {
        Some(format!("メールアドレス {} は既に登録されています。", form.email))
    } else {
        None
    };
    if let Some(message) = duplicate {
        let error = Some(Flash::error(message));
        return register_form_page(&state, &csrf, &flash, error, &form, &[]);
    }

    let password = std::mem::take(&mut form.password);
    let cost = state.config.bcrypt_cost;
    let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;

    match users::create(&state.pool, &form.username, &form.email, &password_hash).await {
        Ok(_) => {}
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            let message = "ユーザー名またはメールアドレスは既に登録されています。";
            let error = Some(Flash::error(message));
            return register_form_page(&state, &csrf, &flash, error, &form, &[]);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Flash::success("登録が完了しました。ログインしてください。").redirect(LOGIN_PATH))
}

/// GET /auth/login
pub async fn login_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    csrf: FormCsrf,
    flash: IncomingFlash,
) -> Result<Response, ApiError> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    login_form_page(&state, &csrf, &flash, None, &LoginForm::default())
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    csrf: FormCsrf,
    flash: IncomingFlash,
    Form(mut form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    csrf.verify(form.csrf_token.as_deref())?;
    form.email = form.email.trim().to_string();

    let errors = validate_login(&form);
    if !errors.is_empty() {
        let error = Flash::error(errors.join(" / "));
        return login_form_page(&state, &csrf, &flash, Some(error), &form);
    }

    let Some(user) = users::find_by_email(&state.pool, &form.email).await? else {
        let error = Flash::error("メールアドレスが正しくありません");
        return login_form_page(&state, &csrf, &flash, Some(error), &form);
    };

    let password = std::mem::take(&mut form.password);
    let hash = user.password.clone();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    if !verified {
        tracing::info!(user_id = user.id, "Login failed: wrong password");
        let error = Flash::error("パスワードが正しくありません");
        return login_form_page(&state, &csrf, &flash, Some(error), &form);
    }

    let lifetime = state.config.session_lifetime_secs;
    let session =
        sessions::create(&state.pool, user.id, chrono::Duration::seconds(lifetime)).await?;
    tracing::info!(user_id = user.id, username = %user.username, "User logged in");

    let mut response = Redirect::to("/").into_response();
    append_cookie(
        &mut response,
        &cookies::build(
            SESSION_COOKIE,
            &session.id,
            CookieOptions {
                max_age: Some(lifetime),
                http_only: true,
                secure: state.config.cookie_secure,
            },
        ),
    );
    flash.consume(&mut response);
    Ok(response)
}

/// GET /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, ApiError> {
    sessions::delete(&state.pool, &user.session_id).await?;
    tracing::info!(user_id = user.user_id, "User logged out");

    let mut response = Flash::info("ログアウトしました。").redirect(LOGIN_PATH);
    append_cookie(&mut response, &cookies::expire(SESSION_COOKIE));
    Ok(response)
}
