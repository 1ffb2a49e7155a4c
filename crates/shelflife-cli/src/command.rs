//! Command parsing and execution for the `shelflife` binary.

use std::io::Write;

use anyhow::{bail, Context, Result};
use chrono::Local;
use serde_json::Value;
use shelflife_core::utils::{format_date, truncate_text, DateStyle};
use shelflife_core::utils::format::DEFAULT_TRUNCATE_LENGTH;
use shelflife_core::{AsyncKeyValueStore, Clock, Entry, ExpiringStore, FileStore, Lookup};
use tracing::debug;

pub const USAGE: &str = "\
Usage: shelflife <command>

Commands:
  set <key> <json> [--ttl <minutes>]   Store a value that expires
  get <key> [--default <json>]         Print the value if still fresh
  inspect <key>                        Show state and time left
  remove <key>                         Delete a key
  list                                 List stored keys
  clear                                Delete every key
  help                                 Show this message

Values that are not valid JSON are stored as strings.
Set RUST_LOG=debug for diagnostics.";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set {
        key: String,
        value: Value,
        ttl_minutes: Option<f64>,
    },
    Get {
        key: String,
        default: Value,
    },
    Inspect {
        key: String,
    },
    Remove {
        key: String,
    },
    List,
    Clear,
    Help,
}

impl Command {
    /// Parse arguments (without the program name)
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some((name, rest)) = args.split_first() else {
            return Ok(Command::Help);
        };

        match name.as_str() {
            "set" => {
                let (positional, ttl) = take_option(rest, "--ttl")?;
                let [key, value] = positional.as_slice() else {
                    bail!("set expects <key> <json>\n\n{}", USAGE);
                };
                let ttl_minutes = ttl
                    .map(|t| {
                        t.parse::<f64>()
                            .ok()
                            .filter(|m| m.is_finite())
                            .with_context(|| format!("--ttl must be a number of minutes, got {:?}", t))
                    })
                    .transpose()?;
                Ok(Command::Set {
                    key: key.to_string(),
                    value: parse_value(value),
                    ttl_minutes,
                })
            }
            "get" => {
                let (positional, default) = take_option(rest, "--default")?;
                let [key] = positional.as_slice() else {
                    bail!("get expects <key>\n\n{}", USAGE);
                };
                Ok(Command::Get {
                    key: key.to_string(),
                    default: default.map(parse_value).unwrap_or(Value::Null),
                })
            }
            "inspect" => Ok(Command::Inspect {
                key: single_key(name, rest)?,
            }),
            "remove" => Ok(Command::Remove {
                key: single_key(name, rest)?,
            }),
            "list" => Ok(Command::List),
            "clear" => Ok(Command::Clear),
            "help" | "--help" | "-h" => Ok(Command::Help),
            other => bail!("Unknown command: {}\n\n{}", other, USAGE),
        }
    }
}

/// Split off `--flag <value>` from positional arguments
fn take_option<'a>(args: &'a [String], flag: &str) -> Result<(Vec<&'a str>, Option<&'a str>)> {
    let mut positional = Vec::new();
    let mut value = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == flag {
            match iter.next() {
                Some(v) => value = Some(v.as_str()),
                None => bail!("{} needs a value", flag),
            }
        } else {
            positional.push(arg.as_str());
        }
    }
    Ok((positional, value))
}

fn single_key(command: &str, rest: &[String]) -> Result<String> {
    match rest {
        [key] => Ok(key.clone()),
        _ => bail!("{} expects <key>\n\n{}", command, USAGE),
    }
}

fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

pub async fn run<C, W>(
    command: Command,
    store: &FileStore,
    cache: &ExpiringStore<C>,
    out: &mut W,
) -> Result<()>
where
    C: Clock,
    W: Write,
{
    match command {
        Command::Set {
            key,
            value,
            ttl_minutes,
        } => {
            let ttl = ttl_minutes.unwrap_or_else(|| cache.default_ttl_minutes());
            cache
                .try_write_async(store, &key, &value, ttl)
                .await
                .with_context(|| format!("Failed to store {}", key))?;
            debug!(key = %key, ttl_minutes = ttl, "Stored entry");
            writeln!(out, "Stored {} for {}m", key, ttl)?;
        }
        Command::Get { key, default } => {
            let value = cache.read_async(store, &key, default).await;
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        }
        Command::Inspect { key } => {
            // Read the raw record first: a stale entry is purged by the lookup
            let entry = store
                .load(&key)
                .await
                .ok()
                .flatten()
                .and_then(|raw| Entry::<Value>::parse(&raw).ok().flatten());
            let lookup = cache.lookup_async::<Value, _>(store, &key).await;

            writeln!(out, "key:     {}", key)?;
            writeln!(out, "state:   {}", lookup.state())?;
            match (&lookup, entry) {
                (Lookup::Fresh(value), Some(entry)) => {
                    if let Some(at) = entry.expires_at() {
                        let local = at.with_timezone(&Local);
                        writeln!(
                            out,
                            "expires: {} {} ({})",
                            format_date(&local, DateStyle::Short),
                            local.format("%H:%M"),
                            entry.expiry_display(cache.clock().now_millis())
                        )?;
                    }
                    let shown = truncate_text(&value.to_string(), DEFAULT_TRUNCATE_LENGTH);
                    writeln!(out, "value:   {}", shown)?;
                }
                (Lookup::Failed(e), _) => writeln!(out, "error:   {}", e)?,
                _ => {}
            }
        }
        Command::Remove { key } => {
            cache.remove_async(store, &key).await;
            writeln!(out, "Removed {}", key)?;
        }
        Command::List => {
            for key in store.keys().context("Failed to list keys")? {
                writeln!(out, "{}", key)?;
            }
        }
        Command::Clear => {
            let removed = store.clear().context("Failed to clear store")?;
            writeln!(out, "Removed {} entries", removed)?;
        }
        Command::Help => writeln!(out, "{}", USAGE)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use shelflife_core::{KeyValueStore, ManualClock};

    const T0: i64 = 1_700_000_000_000;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    async fn run_to_string(
        command: Command,
        store: &FileStore,
        cache: &ExpiringStore<ManualClock>,
    ) -> String {
        let mut out = Vec::new();
        run(command, store, cache, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_set() {
        let command = Command::parse(&args(&["set", "user", r#"{"id":7}"#, "--ttl", "0.5"])).unwrap();
        assert_eq!(
            command,
            Command::Set {
                key: "user".to_string(),
                value: serde_json::json!({"id": 7}),
                ttl_minutes: Some(0.5),
            }
        );
    }

    #[test]
    fn test_parse_plain_text_value_and_flag_first() {
        let command = Command::parse(&args(&["set", "--ttl", "-5", "greeting", "hello"])).unwrap();
        assert_eq!(
            command,
            Command::Set {
                key: "greeting".to_string(),
                value: Value::String("hello".to_string()),
                ttl_minutes: Some(-5.0),
            }
        );
    }

    #[test]
    fn test_parse_get_with_default() {
        let command = Command::parse(&args(&["get", "k", "--default", "fallback"])).unwrap();
        assert_eq!(
            command,
            Command::Get {
                key: "k".to_string(),
                default: Value::String("fallback".to_string()),
            }
        );
        let bare = Command::parse(&args(&["get", "k"])).unwrap();
        assert_eq!(
            bare,
            Command::Get {
                key: "k".to_string(),
                default: Value::Null,
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse(&args(&["set", "only-key"])).is_err());
        assert!(Command::parse(&args(&["set", "k", "v", "--ttl"])).is_err());
        assert!(Command::parse(&args(&["set", "k", "v", "--ttl", "soon"])).is_err());
        assert!(Command::parse(&args(&["set", "k", "v", "--ttl", "inf"])).is_err());
        assert!(Command::parse(&args(&["remove"])).is_err());
        assert!(Command::parse(&args(&["frobnicate"])).is_err());
    }

    #[test]
    fn test_parse_help_and_simple_commands() {
        assert_eq!(Command::parse(&[]).unwrap(), Command::Help);
        assert_eq!(Command::parse(&args(&["--help"])).unwrap(), Command::Help);
        assert_eq!(Command::parse(&args(&["list"])).unwrap(), Command::List);
        assert_eq!(Command::parse(&args(&["clear"])).unwrap(), Command::Clear);
        assert_eq!(
            Command::parse(&args(&["inspect", "k"])).unwrap(),
            Command::Inspect { key: "k".to_string() }
        );
    }

    #[tokio::test]
    async fn test_set_get_and_expire() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let clock = ManualClock::new(T0);
        let cache = ExpiringStore::with_clock(clock.clone()).with_default_ttl(1.0);

        let set = Command::parse(&args(&["set", "greeting", "hello"])).unwrap();
        assert_eq!(run_to_string(set, &store, &cache).await, "Stored greeting for 1m\n");

        let get = Command::parse(&args(&["get", "greeting"])).unwrap();
        assert_eq!(run_to_string(get.clone(), &store, &cache).await, "\"hello\"\n");

        clock.advance(Duration::seconds(61));
        assert_eq!(run_to_string(get, &store, &cache).await, "null\n");
        assert_eq!(store.get("greeting").unwrap(), None);
    }

    #[tokio::test]
    async fn test_inspect_fresh_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let cache = ExpiringStore::with_clock(ManualClock::new(T0));
        cache.write_async(&store, "k", &serde_json::json!([1, 2]), 5.0).await;

        let output = run_to_string(Command::Inspect { key: "k".to_string() }, &store, &cache).await;
        assert!(output.contains("state:   fresh"));
        assert!(output.contains("(expires in 5m)"));
        assert!(output.contains("value:   [1,2]"));
    }

    #[tokio::test]
    async fn test_inspect_record_with_fractional_expiry() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let cache = ExpiringStore::with_clock(ManualClock::new(T0));
        let raw = format!(r#"{{"value":"shared","expires":{}.5}}"#, T0 + 10 * 60_000);
        store.set("legacy", &raw).unwrap();

        let output = run_to_string(Command::Inspect { key: "legacy".to_string() }, &store, &cache).await;
        assert!(output.contains("state:   fresh"));
        assert!(output.contains("(expires in 10m)"));
        assert!(output.contains("value:   \"shared\""));
    }

    #[tokio::test]
    async fn test_set_fractional_ttl() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let clock = ManualClock::new(T0);
        let cache = ExpiringStore::with_clock(clock.clone());

        let set = Command::parse(&args(&["set", "k", "v", "--ttl", "0.5"])).unwrap();
        assert_eq!(run_to_string(set, &store, &cache).await, "Stored k for 0.5m\n");

        clock.advance(Duration::seconds(30));
        let get = Command::parse(&args(&["get", "k"])).unwrap();
        assert_eq!(run_to_string(get.clone(), &store, &cache).await, "\"v\"\n");
        clock.advance(Duration::milliseconds(1));
        assert_eq!(run_to_string(get, &store, &cache).await, "null\n");
    }

    #[tokio::test]
    async fn test_inspect_malformed_and_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let cache = ExpiringStore::with_clock(ManualClock::new(T0));
        store.set("foreign", r#"{"value":1}"#).unwrap();

        let output = run_to_string(Command::Inspect { key: "foreign".to_string() }, &store, &cache).await;
        assert!(output.contains("state:   malformed"));
        assert!(store.get("foreign").unwrap().is_some());

        let output = run_to_string(Command::Inspect { key: "nope".to_string() }, &store, &cache).await;
        assert!(output.contains("state:   missing"));
    }

    #[tokio::test]
    async fn test_list_remove_clear() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let cache = ExpiringStore::with_clock(ManualClock::new(T0));
        cache.write(&store, "b", "2", 5.0);
        cache.write(&store, "a", "1", 5.0);

        assert_eq!(run_to_string(Command::List, &store, &cache).await, "a\nb\n");

        let remove = Command::Remove { key: "a".to_string() };
        assert_eq!(run_to_string(remove.clone(), &store, &cache).await, "Removed a\n");
        assert_eq!(run_to_string(remove, &store, &cache).await, "Removed a\n");

        assert_eq!(run_to_string(Command::Clear, &store, &cache).await, "Removed 1 entries\n");
        assert_eq!(run_to_string(Command::List, &store, &cache).await, "");
    }

    #[tokio::test]
    async fn test_set_over_size_limit_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap().with_max_value_bytes(8);
        let cache = ExpiringStore::with_clock(ManualClock::new(T0));

        let set = Command::parse(&args(&["set", "k", "too long for the limit"])).unwrap();
        let mut out = Vec::new();
        let err = run(set, &store, &cache, &mut out).await.unwrap_err();
        assert!(err.to_string().contains("Failed to store k"));
    }
}
