// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `keyward totp ...`: two-factor enrollment and recovery codes.

use clap::Subcommand;
use qrcode::render::unicode;
use qrcode::QrCode;
use secrecy::ExposeSecret;
use serde::Serialize;

use keyward_core::{KeywardError, TotpCheck};
use keyward_vault::prompt::prompt_secret;

use crate::app::{App, SecondFactor};
use crate::output::Output;

#[derive(Subcommand, Debug)]
pub enum TotpCommand {
    /// Enroll an authenticator app and print recovery codes.
    Setup {
        /// Code from the newly enrolled authenticator, to confirm enrollment.
        #[arg(long)]
        confirm_code: Option<String>,
    },
    /// Turn two-factor authentication off.
    Disable,
    /// Check an authenticator code.
    Verify { code: String },
    /// Use up a recovery code.
    Recover { code: String },
    /// Show how many recovery codes are left.
    Codes,
    /// Replace every recovery code with a fresh set.
    Regenerate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Enrollment {
    provisioning_uri: String,
    recovery_codes: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    result: TotpCheck,
}

#[derive(Debug, Serialize)]
struct CodeCount {
    remaining: usize,
}

#[derive(Debug, Serialize)]
struct NewCodes {
    recovery_codes: Vec<String>,
}

pub async fn run(
    app: &App,
    command: TotpCommand,
    factor: &SecondFactor,
    out: &Output,
) -> Result<(), KeywardError> {
    match command {
        TotpCommand::Setup { confirm_code } => setup(app, confirm_code, factor, out).await,
        TotpCommand::Disable => {
            let unlocked = app.unlock(factor).await?;
            app.totp.disable(&unlocked.session).await?;
            out.emit(&(), |out| out.ok("two-factor authentication disabled"));
            Ok(())
        }
        TotpCommand::Verify { code } => {
            let unlocked = app.unlock_password_only().await?;
            let result = app.totp.verify_code(&unlocked.session, &code).await?;
            report_check(result, out)
        }
        TotpCommand::Recover { code } => {
            let unlocked = app.unlock_password_only().await?;
            let result = app.totp.verify_recovery_code(&unlocked.session, &code).await?;
            report_check(result, out)
        }
        TotpCommand::Codes => {
            let unlocked = app.unlock(factor).await?;
            let remaining = app
                .totp
                .remaining_recovery_code_count(&unlocked.session)
                .await?;
            let report = CodeCount { remaining };
            out.emit(&report, |out| {
                out.field("recovery codes left", &remaining.to_string());
                if (1..=2).contains(&remaining) {
                    out.warn("running low; run `keyward totp regenerate`");
                }
            });
            Ok(())
        }
        TotpCommand::Regenerate => {
            let unlocked = app.unlock(factor).await?;
            let codes = app.totp.regenerate_recovery_codes(&unlocked.session).await?;
            let report = NewCodes {
                recovery_codes: codes,
            };
            out.emit(&report, |out| {
                out.ok("recovery codes replaced; the old ones no longer work");
                print_codes(&report.recovery_codes);
            });
            Ok(())
        }
    }
}

async fn setup(
    app: &App,
    confirm_code: Option<String>,
    factor: &SecondFactor,
    out: &Output,
) -> Result<(), KeywardError> {
    let unlocked = app.unlock(factor).await?;
    let enrollment = app.totp.init_setup()?;

    if !out.is_json() {
        println!("Scan this code with your authenticator app:\n");
        println!("{}", render_qr(&enrollment.provisioning_uri)?);
        println!("Or enter the secret manually: {}\n", enrollment.secret.expose_secret());
    }

    let code = match confirm_code {
        Some(code) => code,
        None => prompt_secret("Code from authenticator: ")?
            .expose_secret()
            .to_string(),
    };
    if !app.totp.check_setup_code(&enrollment.secret, &code)? {
        return Err(KeywardError::InvalidCredentials);
    }
    app.totp
        .enable(
            &unlocked.session,
            &enrollment.secret,
            &enrollment.recovery_codes,
        )
        .await?;

    let report = Enrollment {
        provisioning_uri: enrollment.provisioning_uri,
        recovery_codes: enrollment.recovery_codes,
    };
    out.emit(&report, |out| {
        out.ok("two-factor authentication enabled");
        println!("Store these recovery codes somewhere safe. Each works once:");
        print_codes(&report.recovery_codes);
    });
    Ok(())
}

/// Unicode QR code for a terminal.
fn render_qr(uri: &str) -> Result<String, KeywardError> {
    let code = QrCode::new(uri.as_bytes())
        .map_err(|e| KeywardError::Internal(format!("failed to build QR code: {e}")))?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build())
}

fn report_check(result: TotpCheck, out: &Output) -> Result<(), KeywardError> {
    if result == TotpCheck::Invalid {
        return Err(KeywardError::InvalidCredentials);
    }
    out.emit(&CheckReport { result }, |out| {
        if result == TotpCheck::Valid {
            out.ok("code accepted");
        } else {
            out.warn("two-factor authentication is not enabled");
        }
    });
    Ok(())
}

fn print_codes(codes: &[String]) {
    for code in codes {
        println!("    {code}");
    }
}
