// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registration and login form rules.

use serde::{Deserialize, Serialize};

pub const REQUIRED: &str = "この項目は必須です";
pub const INVALID_EMAIL: &str = "メールアドレスの形式が正しくありません";
pub const PASSWORD_LENGTH: &str = "パスワードは6文字で入力してください";
pub const PASSWORD_DIGITS: &str = "パスワードは数字のみで入力してください";
pub const PASSWORD_MISMATCH: &str = "パスワードが一致しません";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default, skip_serializing)]
    pub password2: String,
    #[serde(default, skip_serializing)]
    pub csrf_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default, skip_serializing)]
    pub csrf_token: Option<String>,
}

/// `local@domain.tld` with no whitespace
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Field errors of a registration, in form order
pub fn validate_registration(form: &RegisterForm) -> Vec<String> {
    let mut errors = Vec::new();

    if form.username.trim().is_empty() {
        errors.push(format!("ユーザー名: {}", REQUIRED));
    }

    if form.email.trim().is_empty() {
        errors.push(format!("メールアドレス: {}", REQUIRED));
    } else if !is_valid_email(form.email.trim()) {
        errors.push(INVALID_EMAIL.to_string());
    }

    if form.password.is_empty() {
        errors.push(format!("パスワード: {}", REQUIRED));
    } else {
        if form.password.chars().count() != 6 {
            errors.push(PASSWORD_LENGTH.to_string());
        }
        if !form.password.chars().all(|c| c.is_ascii_digit()) {
            errors.push(PASSWORD_DIGITS.to_string());
        }
    }

    if form.password2.is_empty() {
        errors.push(format!("パスワード（確認）: {}", REQUIRED));
    } else if form.password2 != form.password {
        errors.push(PASSWORD_MISMATCH.to_string());
    }

    errors
}

/// Field errors of a login attempt
pub fn validate_login(form: &LoginForm) -> Vec<String> {
    let mut errors = Vec::new();
    if form.email.trim().is_empty() {
        errors.push(format!("メールアドレス: {}", REQUIRED));
    } else if !is_valid_email(form.email.trim()) {
        errors.push(INVALID_EMAIL.to_string());
    }
    if form.password.is_empty() {
        errors.push(format!("パスワード: {}", REQUIRED));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(password: &str, password2: &str) -> RegisterForm {
        RegisterForm {
            username: "taro".into(),
            email: "taro@example.com".into(),
            password: password.into(),
            password2: password2.into(),
            csrf_token: None,
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(validate_registration(&form("123456", "123456")).is_empty());
    }

    #[test]
    fn test_password_rules() {
        assert_eq!(
            validate_registration(&form("12345", "12345")),
            vec![PASSWORD_LENGTH.to_string()]
        );
        assert_eq!(
            validate_registration(&form("12a456", "12a456")),
            vec![PASSWORD_DIGITS.to_string()]
        );
        assert_eq!(
            validate_registration(&form("123456", "654321")),
            vec![PASSWORD_MISMATCH.to_string()]
        );
    }

    #[test]
    fn test_email_rules() {
        assert!(is_valid_email("a@b.jp"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.jp"));
        assert!(!is_valid_email("a b@c.jp"));
        assert!(!is_valid_email("a@@b.jp"));

        let mut f = form("123456", "123456");
        f.username = " ".into();
        f.email = "nope".into();
        assert_eq!(validate_registration(&f).len(), 2);
    }
}
