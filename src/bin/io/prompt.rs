// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::stdout;

use crossterm::{
    cursor::{Hide, Show},
    ExecutableCommand,
};

use anyhow::{anyhow, Result};
use requestty::{OnEsc, Question};

use eth_wallet_sim::Ether;

fn check_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        Err("Please enter an account name".to_string())
    } else {
        Ok(())
    }
}

fn check_amount(amount: &str) -> Result<(), String> {
    amount.parse::<Ether>().map(|_| ()).map_err(|e| e.to_string())
}

/// Request an account name
pub(crate) fn request_name(msg: &str) -> Result<String> {
    let q = Question::input("name")
        .message(format!("{}:", msg))
        .on_esc(OnEsc::Terminate)
        .validate_on_key(|name, _| check_name(name).is_ok())
        .validate(|name, _| check_name(name))
        .build();

    let a = requestty::prompt_one(q)?;
    let name = a
        .as_string()
        .ok_or_else(|| anyhow!("Expected a name"))?;
    Ok(name.trim().to_string())
}

/// Request the amount of ETH to send
pub(crate) fn request_amount() -> Result<Ether> {
    let q = Question::input("amt")
        .message("Amount (ETH):")
        .on_esc(OnEsc::Terminate)
        .validate_on_key(|amt, _| check_amount(amt).is_ok())
        .validate(|amt, _| check_amount(amt))
        .build();

    let a = requestty::prompt_one(q)?;
    let amount = a
        .as_string()
        .ok_or_else(|| anyhow!("Expected an amount"))?;
    Ok(amount.parse()?)
}

/// Asks the user for confirmation
pub(crate) fn ask_confirm(msg: &str) -> bool {
    let question = requestty::Question::confirm("confirm")
        .message(msg)
        .on_esc(OnEsc::Terminate)
        .build();

    requestty::prompt_one(question)
        .map(|answer| answer.as_bool())
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Shows the terminal cursor
pub(crate) fn show_cursor() -> anyhow::Result<()> {
    let mut stdout = stdout();
    stdout.execute(Show)?;
    Ok(())
}

/// Hides the terminal cursor
pub(crate) fn hide_cursor() -> anyhow::Result<()> {
    let mut stdout = stdout();
    stdout.execute(Hide)?;
    Ok(())
}
