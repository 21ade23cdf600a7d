use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::{debug, info};

use super::config::{CliConfig, DEFAULT_SERVER_URL};
use super::output::{activity_line, expense_line, tag_line, Output};
use super::{ActivityArgs, ActivityCommand, Cli, Command, ExpenseArgs, ExpenseCommand, TagCommand};
use crate::client::ApiClient;
use crate::models::{
    ActivityId, ActivityRequest, ExpenseId, ExpenseRequest, TagId, TagRequest,
};

/// Execute one CLI invocation.
pub async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(CliConfig::default_path);
    let mut config = CliConfig::load(&config_path)?;
    let server_url = cli
        .url
        .clone()
        .or_else(|| config.server_url.clone())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
    debug!(config = %config_path.display(), %server_url, "Resolved client settings");

    let out = Output::new(cli.json);
    let mut client = ApiClient::new(&server_url, config.tokens())?;

    let result = match cli.command {
        Command::Login { password } => {
            let password = match password {
                Some(password) => password,
                None => read_password()?,
            };
            client.login(&password).await?;
            config.server_url = Some(server_url.clone());
            info!(%server_url, "Logged in");
            out.done(&format!("Logged in to {server_url}"));
            Ok(())
        }
        Command::Logout => {
            config.set_tokens(None);
            config.save(&config_path)?;
            out.done("Logged out");
            return Ok(());
        }
        Command::Tags(cmd) => tags(&mut client, out, cmd).await,
        Command::Expenses(cmd) => expenses(&mut client, out, cmd).await,
        Command::Activities(cmd) => activities(&mut client, out, cmd).await,
    };

    // Persist a refreshed pair even when the command itself failed
    if client.tokens_changed() {
        config.set_tokens(client.tokens());
        config
            .save(&config_path)
            .with_context(|| format!("Failed to save tokens to {}", config_path.display()))?;
    }
    result
}

async fn tags(client: &mut ApiClient, out: Output, cmd: TagCommand) -> Result<()> {
    match cmd {
        TagCommand::List => out.list(&client.list_tags().await?, tag_line),
        TagCommand::Add { name } => {
            let id = client.add_tag(&TagRequest { name }).await?;
            out.done(&format!("Created tag #{id}"));
            Ok(())
        }
        TagCommand::Edit { id, name } => {
            let tag = client.edit_tag(TagId(id), &TagRequest { name }).await?;
            out.one(&tag, tag_line)
        }
        TagCommand::Delete { id } => {
            client.delete_tag(TagId(id)).await?;
            out.done(&format!("Deleted tag #{id}"));
            Ok(())
        }
        TagCommand::Expenses { id } => out.list(&client.tag_expenses(TagId(id)).await?, expense_line),
        TagCommand::Activities { id } => {
            out.list(&client.tag_activities(TagId(id)).await?, activity_line)
        }
    }
}

async fn expenses(client: &mut ApiClient, out: Output, cmd: ExpenseCommand) -> Result<()> {
    match cmd {
        ExpenseCommand::List { from } => out.list(&client.list_expenses(from).await?, expense_line),
        ExpenseCommand::Show { id } => {
            out.one(&client.get_expense(ExpenseId(id)).await?, expense_line)
        }
        ExpenseCommand::Add(args) => {
            let id = client.add_expense(&expense_request(args)).await?;
            out.done(&format!("Created expense #{id}"));
            Ok(())
        }
        ExpenseCommand::Edit { id, fields } => {
            let expense = client
                .edit_expense(ExpenseId(id), &expense_request(fields))
                .await?;
            out.one(&expense, expense_line)
        }
        ExpenseCommand::Delete { id } => {
            client.delete_expense(ExpenseId(id)).await?;
            out.done(&format!("Deleted expense #{id}"));
            Ok(())
        }
    }
}

async fn activities(client: &mut ApiClient, out: Output, cmd: ActivityCommand) -> Result<()> {
    match cmd {
        ActivityCommand::List { from } => {
            out.list(&client.list_activities(from).await?, activity_line)
        }
        ActivityCommand::Show { id } => {
            let activity = client.get_activity(ActivityId(id)).await?;
            out.one(&activity, activity_line)?;
            if !out.is_json() {
                for expense in &activity.expenses {
                    println!("    {}", expense_line(expense));
                }
            }
            Ok(())
        }
        ActivityCommand::Add(args) => {
            let id = client.add_activity(&activity_request(args)).await?;
            out.done(&format!("Created activity #{id}"));
            Ok(())
        }
        ActivityCommand::Edit { id, fields } => {
            let activity = client
                .edit_activity(ActivityId(id), &activity_request(fields))
                .await?;
            out.one(&activity, activity_line)
        }
        ActivityCommand::Delete { id } => {
            client.delete_activity(ActivityId(id)).await?;
            out.done(&format!("Deleted activity #{id}"));
            Ok(())
        }
        ActivityCommand::Expenses { id } => {
            out.list(&client.activity_expenses(ActivityId(id)).await?, expense_line)
        }
    }
}

fn expense_request(args: ExpenseArgs) -> ExpenseRequest {
    ExpenseRequest {
        label: args.label,
        time: args.time.unwrap_or_else(Utc::now),
        value: args.value,
        unit: args.unit,
        activity_id: args.activity.map(ActivityId),
        tag_ids: args.tags.into_iter().map(TagId).collect(),
    }
}

fn activity_request(args: ActivityArgs) -> ActivityRequest {
    ActivityRequest {
        label: args.label,
        place: args.place,
        description: args.description,
        time: args.time.unwrap_or_else(Utc::now),
        duration: args.duration,
        tag_ids: args.tags.into_iter().map(TagId).collect(),
    }
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("No password given");
    }
    Ok(password)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_expense_request_from_args() {
        let request = expense_request(ExpenseArgs {
            label: "Taxi".to_string(),
            value: 23.0,
            unit: "EUR".to_string(),
            time: None,
            activity: Some(7),
            tags: vec![2, 5],
        });
        assert_eq!(request.activity_id, Some(ActivityId(7)));
        assert_eq!(request.tag_ids, vec![TagId(2), TagId(5)]);
        assert!(request.time <= Utc::now());
    }

    #[test]
    fn test_activity_request_from_args() {
        let request = activity_request(ActivityArgs {
            label: "Swim".to_string(),
            place: "Pool".to_string(),
            description: String::new(),
            time: None,
            duration: Duration::from_secs(1800),
            tags: Vec::new(),
        });
        assert_eq!(request.place, "Pool");
        assert_eq!(request.duration, Duration::from_secs(1800));
        assert!(request.tag_ids.is_empty());
    }
}
