// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload formatting for user enrollment commands.
//!
//! Every payload starts with a `C:<code>:` header carrying a fresh device
//! code. A user with a photo is enrolled as a batch under one umbrella code:
//! the upsert carries `<code>` and the photo `<code>01`.

use std::sync::atomic::{AtomicU32, Ordering};

use attend_core::{AttendError, UserRecord, parse_device_code};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Sequence suffix of the photo command in an enrollment batch.
const PHOTO_SUFFIX: &str = "01";

/// Process-wide source of device codes: 8 uppercase hex digits from a
/// wrapping counter.
#[derive(Debug)]
pub struct CodeGenerator {
    next: AtomicU32,
}

impl CodeGenerator {
    /// Start from a random point so codes differ across restarts.
    pub fn new() -> Self {
        Self::starting_at(rand::random())
    }

    pub fn starting_at(seed: u32) -> Self {
        Self {
            next: AtomicU32::new(seed),
        }
    }

    pub fn next_code(&self) -> String {
        format!("{:08X}", self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Field values cannot contain the protocol's tab or line separators.
fn field(value: &str) -> String {
    value
        .chars()
        .map(|c| if matches!(c, '\t' | '\r' | '\n') { ' ' } else { c })
        .collect()
}

pub fn user_upsert(code: &str, pin: &str, name: &str) -> String {
    format!(
        "C:{code}:DATA UPDATE USERINFO PIN={pin}\tName={}\tPri=0\tPasswd=\tCard=\tGrp=1\tTZ=0000000100000000\tVerify=0",
        field(name)
    )
}

/// `photo` is the base64 JPEG; `Size` is its encoded length.
pub fn user_photo(code: &str, pin: &str, photo: &str) -> String {
    format!(
        "C:{code}:DATA UPDATE USERPIC PIN={pin}\tSize={}\tContent={photo}",
        photo.len()
    )
}

pub fn user_delete(code: &str, pin: &str) -> String {
    format!("C:{code}:DATA DELETE USERINFO PIN={pin}")
}

/// Upsert, then photo when present, under one umbrella code.
pub fn enrollment_payloads(codes: &CodeGenerator, user: &UserRecord) -> Vec<String> {
    let code = codes.next_code();
    let mut payloads = vec![user_upsert(&code, &user.pin, &user.name)];
    if let Some(photo) = user.photo.as_deref().filter(|p| !p.is_empty()) {
        payloads.push(user_photo(&format!("{code}{PHOTO_SUFFIX}"), &user.pin, photo));
    }
    payloads
}

/// Reject user fields that would produce an unroutable payload.
pub fn validate_user(pin: &str, name: &str, photo: Option<&str>) -> Result<(), AttendError> {
    if pin.is_empty() || pin.chars().any(|c| c.is_whitespace() || c == '&') {
        return Err(AttendError::MalformedInput(format!(
            "pin must be a non-empty token without whitespace, got {pin:?}"
        )));
    }
    if name.trim().is_empty() {
        return Err(AttendError::MalformedInput("name must not be empty".into()));
    }
    if let Some(photo) = photo {
        STANDARD
            .decode(photo)
            .map_err(|e| AttendError::MalformedInput(format!("photo is not valid base64: {e}")))?;
    }
    Ok(())
}

/// Reject operator payloads that are blank or lack a `C:<code>:` header.
///
/// A headerless command could be delivered but never confirmed.
pub fn validate_payloads<S: AsRef<str>>(payloads: &[S]) -> Result<(), AttendError> {
    for payload in payloads {
        let payload = payload.as_ref();
        if payload.trim().is_empty() {
            return Err(AttendError::MalformedInput(
                "payloads must not be blank".into(),
            ));
        }
        if parse_device_code(payload).is_none() {
            return Err(AttendError::MalformedInput(format!(
                "payload must start with a C:<code>: header, got {payload:?}"
            )));
        }
    }
    Ok(())
}
