//! crime-tracker: interactive menu for tracking faction crime counts.
//!
//! Usage:
//!   crime-tracker
//!   crime-tracker --db other.db
//!   crime-tracker --config tracker.json
//!
//! Flags override the config file, which overrides built-in defaults.

use anyhow::Result;
use crimetrack_core::{
    config::TrackerConfig,
    cycle::{run_fetch_cycle, CycleEvent},
    fetcher::{StatFetcher, TornClient},
    report::build_report,
    store::MemberStore,
    types::MemberId,
};
use std::env;
use std::io::{self, BufRead, Write};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config_path = args
        .windows(2)
        .find(|w| w[0] == "--config")
        .map(|w| w[1].as_str());
    let db_override = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str());

    let mut config = match config_path {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };
    if let Some(db) = db_override {
        config.db_path = db.to_string();
    }

    println!("Starting Faction Crime Tracker...");
    let store = MemberStore::open(&config.db_path)?;
    store.migrate()?;
    println!("Database '{}' is ready.", config.db_path);
    log::info!(
        "tracker started: db={} api={} delay={}ms",
        config.db_path,
        config.api_base_url,
        config.rate_limit_delay_ms
    );

    let client = TornClient::new(&config)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    menu_loop(&mut input, &store, &client, &config)
}

fn menu_loop(
    input: &mut impl BufRead,
    store: &MemberStore,
    fetcher: &dyn StatFetcher,
    config: &TrackerConfig,
) -> Result<()> {
    loop {
        clear_screen();
        print_menu();
        let choice = match prompt(input, "Enter your choice (0-5): ")? {
            Some(choice) => choice,
            // stdin closed; nothing more to do interactively.
            None => return Ok(()),
        };

        let outcome = match choice.as_str() {
            "1" => add_member(input, store),
            "2" => remove_member(input, store),
            "3" => list_members(input, store),
            "4" => update_all_stats(store, fetcher, config),
            "5" => show_report(store),
            "0" => {
                println!("\nExiting program. Goodbye!");
                return Ok(());
            }
            _ => {
                println!("\n!!! Invalid choice. Please enter a number between 0 and 5. !!!");
                pause(input)?;
                continue;
            }
        };

        // Failures inside an action drop back to the menu instead of
        // killing the session.
        if let Err(error) = outcome {
            log::error!("action failed: {error:#}");
            println!("\n!!! {error}");
        }
        pause(input)?;
    }
}

fn print_menu() {
    println!("\n===== Torn Faction Crime Tracker Menu =====");
    println!(" 1. Add / Update Member");
    println!(" 2. Remove Member");
    println!(" 3. List All Members (and Edit/Delete)");
    println!(" 4. Update All Member Stats (Fetch from API)");
    println!(" 5. Show Crime Results (Since Last Update)");
    println!(" 0. Exit");
    println!("==========================================");
}

// ── Menu actions ───────────────────────────────────────────────────

fn add_member(input: &mut impl BufRead, store: &MemberStore) -> Result<()> {
    println!("\n--- Add/Update Faction Member ---");
    let member_id =
        match prompt_member_id(input, "Enter Torn User ID (or press Enter to cancel): ")? {
            Some(id) => id,
            None => return Ok(()),
        };

    let existing = store.get(member_id)?;
    let verb = if existing.is_some() { "Update" } else { "Add" };
    println!("\n--- {verb} details for User ID: {member_id} ---");

    let (api_key, display_name) = match &existing {
        Some(member) => {
            println!("Current Name: {}", not_set(member.display_name.as_deref()));
            println!("Current API Key: {}", member.api_key);
            println!("(Press Enter to keep current values)");

            let entered = match prompt(input, &format!("Enter API Key [{}]: ", member.api_key))? {
                Some(entered) => entered,
                None => return Ok(()),
            };
            let api_key = if entered.is_empty() {
                member.api_key.clone()
            } else {
                entered
            };

            let entered = match prompt(
                input,
                &format!(
                    "Enter Member's Name [{}]: ",
                    not_set(member.display_name.as_deref())
                ),
            )? {
                Some(entered) => entered,
                None => return Ok(()),
            };
            (api_key, merged_name(&entered, member.display_name.as_deref()))
        }
        None => {
            let api_key = loop {
                let entered = match prompt(input, "Enter API Key: ")? {
                    Some(entered) => entered,
                    None => return Ok(()),
                };
                if !entered.is_empty() {
                    break entered;
                }
                println!("!!! API Key cannot be empty when adding a new member.");
            };

            let entered = match prompt(input, "Enter Member's Name (optional): ")? {
                Some(entered) => entered,
                None => return Ok(()),
            };
            (api_key, merged_name(&entered, None))
        }
    };

    println!("\n--- Review Details ---");
    println!("  User ID: {member_id}");
    println!("  API Key: {api_key}");
    println!("  Name:    {}", not_set(display_name.as_deref()));

    let question = match existing {
        Some(_) => "Confirm updating this member? (yes/no): ",
        None => "Confirm adding this member? (yes/no): ",
    };
    if !confirm(input, question)? {
        println!("\n--- Operation cancelled. ---");
        return Ok(());
    }

    store.upsert(member_id, &api_key, display_name.as_deref())?;
    let shown = display_name.as_deref().unwrap_or("N/A");
    match existing {
        Some(_) => println!("\n--- Member {member_id} ('{shown}') updated successfully. ---"),
        None => println!("\n--- Member {member_id} ('{shown}') added successfully. ---"),
    }
    Ok(())
}

fn remove_member(input: &mut impl BufRead, store: &MemberStore) -> Result<()> {
    println!("\n--- Remove Faction Member ---");
    let member_id = match prompt_member_id(
        input,
        "Enter Torn User ID of member to remove (or press Enter to cancel): ",
    )? {
        Some(id) => id,
        None => return Ok(()),
    };
    confirm_and_remove(input, store, member_id)
}

fn list_members(input: &mut impl BufRead, store: &MemberStore) -> Result<()> {
    println!("\n--- Current Faction Members ---");
    let members = store.list_all()?;
    if members.is_empty() {
        println!("No members found in the database. Use 'Add Member' to add some.");
        return Ok(());
    }

    println!("{:<10} {:<25} {}", "User ID", "Name", "Last Stat Update (UTC)");
    println!("{}", "-".repeat(60));
    for member in &members {
        let name = member.display_name.as_deref().unwrap_or("(No Name Set)");
        let updated = match member.current {
            Some(snapshot) => snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => "Never".to_string(),
        };
        println!("{:<10} {:<25} {}", member.member_id, name, updated);
    }
    println!("{}", "-".repeat(60));

    loop {
        let line = match prompt(
            input,
            "Enter User ID to Edit/Delete, or press Enter to return to menu: ",
        )? {
            Some(line) if !line.is_empty() => line,
            _ => return Ok(()),
        };
        let target: MemberId = match line.parse() {
            Ok(id) => id,
            Err(_) => {
                println!("!!! Invalid input. Please enter a numeric User ID or press Enter.");
                continue;
            }
        };
        // Only ids from the list above are manageable here.
        if !members.iter().any(|m| m.member_id == target) {
            println!("!!! Invalid User ID {target}. Please enter an ID from the list above.");
            continue;
        }

        let action = match prompt(
            input,
            &format!("Manage User {target}: (E)dit details, (D)elete member, or (C)ancel? "),
        )? {
            Some(action) => action.to_lowercase(),
            None => return Ok(()),
        };
        match action.as_str() {
            "e" => {
                edit_member(input, store, target)?;
                return Ok(());
            }
            "d" => {
                confirm_and_remove(input, store, target)?;
                return Ok(());
            }
            "c" => println!("--- Action cancelled. ---"),
            _ => println!("!!! Invalid choice. Please enter E, D, or C."),
        }
    }
}

fn edit_member(input: &mut impl BufRead, store: &MemberStore, member_id: MemberId) -> Result<()> {
    let member = match store.get(member_id)? {
        Some(member) => member,
        None => {
            println!("!!! Error: Member with ID {member_id} not found.");
            return Ok(());
        }
    };

    println!("\n--- Editing Member ID: {member_id} ---");
    println!("Current Name: {}", not_set(member.display_name.as_deref()));
    println!("Current API Key: {}", member.api_key);
    println!("(Press Enter to keep current values)");

    let entered_key = match prompt(input, &format!("Enter NEW API Key [{}]: ", member.api_key))? {
        Some(entered) => entered,
        None => return Ok(()),
    };
    let api_key = if entered_key.is_empty() {
        member.api_key.clone()
    } else {
        entered_key
    };

    let entered_name = match prompt(
        input,
        &format!("Enter NEW Name [{}]: ", not_set(member.display_name.as_deref())),
    )? {
        Some(entered) => entered,
        None => return Ok(()),
    };
    let display_name = merged_name(&entered_name, member.display_name.as_deref());

    if api_key == member.api_key && display_name == member.display_name {
        println!("\n--- No changes detected. Operation cancelled. ---");
        return Ok(());
    }

    println!("\n--- Review Changes ---");
    println!("  User ID: {member_id}");
    println!("  API Key: {api_key}");
    println!("  Name:    {}", not_set(display_name.as_deref()));

    if !confirm(input, "Confirm saving these changes? (yes/no): ")? {
        println!("\n--- Operation cancelled. ---");
        return Ok(());
    }

    store.upsert(member_id, &api_key, display_name.as_deref())?;
    println!(
        "\n--- Member {member_id} ('{}') updated successfully. ---",
        display_name.as_deref().unwrap_or("N/A")
    );
    Ok(())
}

fn confirm_and_remove(
    input: &mut impl BufRead,
    store: &MemberStore,
    member_id: MemberId,
) -> Result<()> {
    let member = match store.get(member_id)? {
        Some(member) => member,
        None => {
            println!("\n--- Member with User ID {member_id} not found in the database. ---");
            return Ok(());
        }
    };

    println!(
        "\nSelected member: {} (ID: {member_id})",
        member.display_name.as_deref().unwrap_or("N/A")
    );
    if !confirm(
        input,
        "Are you sure you want to permanently remove this member and their stats? (yes/no): ",
    )? {
        println!("\n--- Removal cancelled. ---");
        return Ok(());
    }

    if store.remove(member_id)? {
        println!("\n--- Member {member_id} removed successfully. ---");
    } else {
        println!("\n--- Failed to remove member {member_id}. ---");
    }
    Ok(())
}

fn update_all_stats(
    store: &MemberStore,
    fetcher: &dyn StatFetcher,
    config: &TrackerConfig,
) -> Result<()> {
    println!("\n--- Update Crime Stats for All Members ---");
    let total = store.member_count()?;
    if total == 0 {
        println!("No members found in the database to update.");
        return Ok(());
    }
    println!("Starting update for {total} members...");

    let report = run_fetch_cycle(
        store,
        fetcher,
        config.rate_limit_delay(),
        &mut |event| match event {
            CycleEvent::Fetching {
                position,
                total,
                member_id,
                label,
            } => {
                print!("({position}/{total}) Fetching for {label} (ID: {member_id})... ");
                let _ = io::stdout().flush();
            }
            CycleEvent::Fetched { crime_count, .. } => {
                println!("Success! Crimes: {crime_count}");
            }
            CycleEvent::Failed { error, .. } => {
                println!("Failed! Error: {error}");
            }
        },
    )?;

    println!(
        "\n--- Update finished. Success: {}, Failed: {} ---",
        report.succeeded, report.failed
    );
    Ok(())
}

fn show_report(store: &MemberStore) -> Result<()> {
    println!("\n--- Crime Stats Results (Since Last Update) ---");
    let members = store.list_all()?;
    let report = build_report(&members);

    if report.rows.is_empty() && report.skipped.is_empty() {
        println!("\nNo members found with two consecutive valid crime counts.");
        println!("Please run 'Update All Stats' at least twice to see results.");
        return Ok(());
    }

    if report.rows.is_empty() {
        println!("\nNo valid differences could be calculated.");
    } else {
        match report.period {
            Some((start, end)) => println!(
                "\nPeriod approx: {} to {} UTC",
                start.format("%Y-%m-%d %H:%M"),
                end.format("%Y-%m-%d %H:%M")
            ),
            None => println!("\nPeriod times unavailable."),
        }
        println!("{}", "-".repeat(65));
        println!(
            "{:<5} {:<10} {:<25} {:<12} {}",
            "Rank", "User ID", "Name", "Crimes Done", "Period"
        );
        println!("{}", "-".repeat(65));
        for row in &report.rows {
            let window = format!(
                "{}-{}",
                row.period_start.format("%m/%d %H:%M"),
                row.period_end.format("%m/%d %H:%M")
            );
            println!(
                "{:<5} {:<10} {:<25} {:<12} {}",
                row.rank, row.member_id, row.label, row.delta, window
            );
        }
        println!("{}", "-".repeat(65));
    }

    if !report.skipped.is_empty() {
        println!("\nNote: Some members were skipped in results calculation:");
        for skipped in &report.skipped {
            println!(
                "- {} (ID: {}): {}",
                skipped.label,
                skipped.member_id,
                skipped.reason()
            );
        }
    }
    Ok(())
}

// ── Prompt helpers ─────────────────────────────────────────────────

/// Print a prompt and read one trimmed line. `None` means stdin closed.
fn prompt(input: &mut impl BufRead, message: &str) -> Result<Option<String>> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Prompt for a numeric user id, re-asking on junk. Empty input (or a
/// closed stream) cancels.
fn prompt_member_id(input: &mut impl BufRead, message: &str) -> Result<Option<MemberId>> {
    loop {
        let line = match prompt(input, message)? {
            Some(line) if !line.is_empty() => line,
            _ => return Ok(None),
        };
        match line.parse::<MemberId>() {
            Ok(id) => return Ok(Some(id)),
            Err(_) => println!("!!! Invalid input. User ID must be a number."),
        }
    }
}

/// Only a literal "yes" (any case) confirms.
fn confirm(input: &mut impl BufRead, message: &str) -> Result<bool> {
    match prompt(input, message)? {
        Some(answer) => Ok(answer.eq_ignore_ascii_case("yes")),
        None => Ok(false),
    }
}

fn pause(input: &mut impl BufRead) -> Result<()> {
    let _ = prompt(input, "\nPress Enter to return to the menu...")?;
    Ok(())
}

/// ANSI clear and cursor home. The menu repaints after every action.
fn clear_screen() {
    print!("\x1b[2J\x1b[1;1H");
}

/// Empty input on an edit prompt means "keep what's stored".
fn merged_name(entered: &str, current: Option<&str>) -> Option<String> {
    if entered.is_empty() {
        current.map(str::to_string)
    } else {
        Some(entered.to_string())
    }
}

fn not_set(name: Option<&str>) -> &str {
    name.unwrap_or("(Not set)")
}

#[cfg(test)]
mod tests {
    use super::merged_name;

    /// Blank input on an edit prompt keeps the stored name.
    #[test]
    fn blank_input_keeps_the_stored_name() {
        assert_eq!(merged_name("", Some("Kaito")), Some("Kaito".to_string()));
    }

    #[test]
    fn typed_input_replaces_the_stored_name() {
        assert_eq!(
            merged_name("NewName", Some("Old")),
            Some("NewName".to_string())
        );
    }

    #[test]
    fn blank_input_with_no_stored_name_stays_unset() {
        assert_eq!(merged_name("", None), None);
    }
}
