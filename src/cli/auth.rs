//! Register, login and logout commands

use colored::Colorize;
use dialoguer::{Input, Password, theme::ColorfulTheme};

use crate::cli::{
    CommandContext, CredentialArgs, GlobalOptions, LoginArgs, OutputFormat, RegisterArgs,
};
use crate::client::{LoginRequest, RegisterRequest, UserResponse};
use crate::error::Result;
use crate::store::TokenState;

fn prompt_if_missing(value: &Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value.clone()),
        None => Ok(Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .interact_text()?),
    }
}

fn password(credentials: &CredentialArgs, confirm: bool) -> Result<String> {
    if let Some(password) = &credentials.password {
        return Ok(password.clone());
    }

    let theme = ColorfulTheme::default();
    let mut prompt = Password::with_theme(&theme).with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords don't match");
    }
    Ok(prompt.interact()?)
}

fn print_signed_in(ctx: &CommandContext, user: &UserResponse, verb: &str) -> Result<()> {
    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(user)?),
        OutputFormat::Pretty => {
            println!("{} {} as {} <{}>", "✓".green(), verb, user.name.bold(), user.email);
            if let TokenState::Held { tier, expires_at } = ctx.store.state() {
                println!(
                    "  Session stored in {} tier, expires {}",
                    tier,
                    expires_at.format("%Y-%m-%d %H:%M UTC")
                );
            }
        }
    }
    Ok(())
}

/// Run the register command
pub async fn register(opts: &GlobalOptions, args: &RegisterArgs) -> Result<()> {
    let mut ctx = CommandContext::new(opts)?;

    let request = RegisterRequest {
        name: prompt_if_missing(&args.name, "Name")?,
        email: prompt_if_missing(&args.credentials.email, "Email")?,
        password: password(&args.credentials, true)?,
    };

    let user = ctx
        .client
        .sign_up(&request, ctx.remember_me(args.credentials.no_remember))
        .await?;
    ctx.remember_api_host(opts)?;

    print_signed_in(&ctx, &user, "Registered and signed in")
}

/// Run the login command
pub async fn login(opts: &GlobalOptions, args: &LoginArgs) -> Result<()> {
    let mut ctx = CommandContext::new(opts)?;

    let request = LoginRequest {
        email: prompt_if_missing(&args.credentials.email, "Email")?,
        password: password(&args.credentials, false)?,
    };

    let user = ctx
        .client
        .sign_in(&request, ctx.remember_me(args.credentials.no_remember))
        .await?;
    ctx.remember_api_host(opts)?;

    print_signed_in(&ctx, &user, "Signed in")
}

/// Run the logout command
pub async fn logout(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let was_signed_in = ctx.store.has_token();

    ctx.client.sign_out().await?;

    match ctx.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "signed_out": true, "had_session": was_signed_in })
        ),
        OutputFormat::Pretty if was_signed_in => println!("{} Signed out", "✓".green()),
        OutputFormat::Pretty => println!("{} No active session", "○".dimmed()),
    }
    Ok(())
}
