//! Interactive command console.
//!
//! A line-oriented interpreter over any reader/writer pair. It talks to the
//! store only through the [`Storage`] contract and the model lifecycle, so
//! it behaves the same on either backend.

use crate::cli::output::format_record_list;
use crate::core::model;
use crate::core::{ClassTag, Record};
use crate::error::{CommandError, Error, Result};
use crate::storage::Storage;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::io::{BufRead, Write};
use std::sync::OnceLock;

/// Prompt shown before each line in interactive mode.
pub const PROMPT: &str = "(hbnb) ";

/// Commands reachable through `<Class>.<command>(...)`.
const DOT_COMMANDS: [&str; 5] = ["all", "count", "show", "destroy", "update"];

/// Attributes cast to integers on update.
const INT_ATTRIBUTES: [&str; 4] = ["number_rooms", "number_bathrooms", "max_guest", "price_by_night"];

/// Attributes cast to floats on update.
const FLOAT_ATTRIBUTES: [&str; 2] = ["latitude", "longitude"];

const HELP_TOPICS: &[(&str, &str)] = &[
    ("EOF", "Exits the program without formatting"),
    ("all", "Shows all objects, or all objects of a class\n[Usage]: all [className]"),
    ("count", "Counts the number of class instances\n[Usage]: count <className>"),
    (
        "create",
        "Creates an instance of a class\n[Usage]: create <className> [attribute_name=attribute_value ...]",
    ),
    (
        "destroy",
        "Destroys an individual instance of a class\n[Usage]: destroy <className> <objectId>",
    ),
    ("help", "List available commands with \"help\" or detailed help with \"help cmd\"."),
    ("quit", "Exits the program with formatting"),
    ("show", "Shows an individual instance of a class\n[Usage]: show <className> <objectId>"),
    (
        "update",
        "Updates an object with new information\n[Usage]: update <className> <id> <attName> <attVal>",
    ),
];

/// Whether the loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Stop the loop.
    Quit,
}

/// The console interpreter.
pub struct Console<'a, W: Write> {
    storage: &'a mut dyn Storage,
    out: W,
    interactive: bool,
}

impl<'a, W: Write> Console<'a, W> {
    /// Creates a non-interactive console writing to `out`.
    pub fn new(storage: &'a mut dyn Storage, out: W) -> Self {
        Self {
            storage,
            out,
            interactive: false,
        }
    }

    /// Enables or disables the prompt.
    #[must_use]
    pub const fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Returns the output sink.
    pub const fn output(&self) -> &W {
        &self.out
    }

    /// Reads and executes lines until `quit`, `EOF`, or end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or the output cannot be
    /// written. Command failures are reported inline and do not stop the loop.
    pub fn run<R: BufRead>(&mut self, mut input: R) -> Result<()> {
        let mut line = String::new();
        loop {
            if self.interactive {
                write!(self.out, "{PROMPT}").map_err(output_failed)?;
                self.out.flush().map_err(output_failed)?;
            }
            line.clear();
            if input.read_line(&mut line)? == 0 {
                if self.interactive {
                    self.say("")?;
                }
                return Ok(());
            }
            if self.execute(&line)? == Flow::Quit {
                return Ok(());
            }
        }
    }

    /// Executes one console line.
    ///
    /// # Errors
    ///
    /// Returns an error only if the output cannot be written.
    pub fn execute(&mut self, line: &str) -> Result<Flow> {
        let line = rewrite_dot_syntax(line.trim());
        let (command, args) = line.split_once(' ').unwrap_or((line.as_str(), ""));
        let args = args.trim();
        tracing::debug!(command, "console command");

        let outcome = match command {
            "" => Ok(()),
            "quit" => return Ok(Flow::Quit),
            "EOF" => {
                self.say("")?;
                return Ok(Flow::Quit);
            }
            "help" => self.do_help(args),
            "create" => self.do_create(args),
            "show" => self.do_show(args),
            "destroy" => self.do_destroy(args),
            "all" => self.do_all(args),
            "count" => self.do_count(args),
            "update" => self.do_update(args),
            _ => self.say(&format!("*** Unknown syntax: {line}")),
        };

        match outcome {
            Ok(()) => Ok(Flow::Continue),
            Err(e @ Error::Command(CommandError::ExecutionFailed(_))) => Err(e),
            Err(e) => {
                tracing::warn!(command, error = %e, "console command failed");
                self.say(&format!("** {e} **"))?;
                Ok(Flow::Continue)
            }
        }
    }

    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}").map_err(output_failed)
    }

    /// Validates the class argument, printing the console message on failure.
    fn class_arg(&mut self, name: Option<&str>) -> Result<Option<ClassTag>> {
        match name {
            None | Some("") => {
                self.say("** class name missing **")?;
                Ok(None)
            }
            Some(name) => match ClassTag::parse(name) {
                Some(tag) => Ok(Some(tag)),
                None => {
                    self.say("** class doesn't exist **")?;
                    Ok(None)
                }
            },
        }
    }

    /// Resolves `<Class> <id>` to a stored record, printing the console
    /// message on failure.
    fn instance_arg(&mut self, args: &str) -> Result<Option<Record>> {
        let mut parts = args.split_whitespace();
        let Some(class) = self.class_arg(parts.next())? else {
            return Ok(None);
        };
        let Some(id) = parts.next() else {
            self.say("** instance id missing **")?;
            return Ok(None);
        };
        let found = self.storage.get(class.as_str(), id)?;
        if found.is_none() {
            self.say("** no instance found **")?;
        }
        Ok(found)
    }

    fn do_help(&mut self, topic: &str) -> Result<()> {
        if topic.is_empty() {
            let names: Vec<&str> = HELP_TOPICS.iter().map(|(name, _)| *name).collect();
            self.say("\nDocumented commands (type help <topic>):")?;
            self.say("========================================")?;
            self.say(&names.join("  "))?;
            return self.say("");
        }
        match HELP_TOPICS.iter().find(|(name, _)| *name == topic) {
            Some((_, text)) => {
                self.say(text)?;
                self.say("")
            }
            None => self.say(&format!("*** No help on {topic}")),
        }
    }

    fn do_create(&mut self, args: &str) -> Result<()> {
        let mut parts = args.split_whitespace();
        let Some(class) = self.class_arg(parts.next())? else {
            return Ok(());
        };
        let attrs = parse_create_params(parts);
        let record = model::create(self.storage, class, attrs)?;
        self.say(&record.id)
    }

    fn do_show(&mut self, args: &str) -> Result<()> {
        match self.instance_arg(args)? {
            Some(record) => self.say(&record.to_string()),
            None => Ok(()),
        }
    }

    fn do_destroy(&mut self, args: &str) -> Result<()> {
        if let Some(record) = self.instance_arg(args)? {
            model::delete(self.storage, &record)?;
        }
        Ok(())
    }

    fn do_all(&mut self, args: &str) -> Result<()> {
        let classes: Vec<ClassTag> = match args.split_whitespace().next() {
            None => ClassTag::ALL.to_vec(),
            Some(name) => match ClassTag::parse(name) {
                Some(tag) => vec![tag],
                None => return self.say("** class doesn't exist **"),
            },
        };
        let mut records = Vec::new();
        for class in classes {
            records.extend(self.storage.all(Some(class.as_str()))?.into_values());
        }
        self.say(&format_record_list(&records))
    }

    fn do_count(&mut self, args: &str) -> Result<()> {
        let Some(class) = self.class_arg(args.split_whitespace().next())? else {
            return Ok(());
        };
        let count = self.storage.count(Some(class.as_str()))?;
        self.say(&count.to_string())
    }

    fn do_update(&mut self, args: &str) -> Result<()> {
        let (head, rest) = args.split_once(' ').unwrap_or((args, ""));
        let (id, rest) = rest.trim_start().split_once(' ').unwrap_or((rest.trim_start(), ""));
        let Some(mut record) = self.instance_arg(&format!("{head} {id}"))? else {
            return Ok(());
        };

        let rest = rest.trim();
        let pairs = match parse_dict(rest) {
            Some(dict) => dict.into_iter().collect(),
            None => {
                let (name, value) = parse_update_pair(rest);
                vec![(name, Value::String(value))]
            }
        };

        let mut updates = Vec::with_capacity(pairs.len());
        for (name, value) in pairs {
            if name.is_empty() {
                return self.say("** attribute name missing **");
            }
            if value.is_null() || value.as_str() == Some("") {
                return self.say("** value missing **");
            }
            let value = cast_attribute(&name, value)?;
            updates.push((name, value));
        }

        for (name, value) in updates {
            record.set(&name, value);
        }
        model::save(self.storage, &mut record)
    }
}

fn output_failed(err: std::io::Error) -> Error {
    CommandError::ExecutionFailed(format!("cannot write console output: {err}")).into()
}

#[allow(clippy::expect_used)]
fn dot_syntax() -> &'static Regex {
    static DOT_SYNTAX: OnceLock<Regex> = OnceLock::new();
    DOT_SYNTAX.get_or_init(|| Regex::new(r"^(\w+)\.(\w+)\((.*)\)$").expect("valid regex"))
}

#[allow(clippy::expect_used)]
fn create_param() -> &'static Regex {
    static CREATE_PARAM: OnceLock<Regex> = OnceLock::new();
    CREATE_PARAM.get_or_init(|| {
        Regex::new(
            r#"^([A-Za-z_]\w*)=(?:(?P<str>".*")|(?P<float>[-+]?\d+\.\d+)|(?P<int>[-+]?\d+))$"#,
        )
        .expect("valid regex")
    })
}

/// Rewrites `<Class>.<command>(<args>)` into `<command> <Class> <args>`.
///
/// Lines that do not match, or name a command without a dot form, are
/// returned unchanged.
fn rewrite_dot_syntax(line: &str) -> String {
    let Some(caps) = dot_syntax().captures(line) else {
        return line.to_string();
    };
    let (class, command, inner) = (&caps[1], &caps[2], caps[3].trim());
    if !DOT_COMMANDS.contains(&command) {
        return line.to_string();
    }

    let (id, rest) = inner.split_once(", ").unwrap_or((inner, ""));
    let id = id.replace('"', "");
    let rest = rest.trim();
    let rest = if rest.starts_with('{') && rest.ends_with('}') {
        rest.to_string()
    } else {
        rest.replace(',', "")
    };

    [command, class, id.as_str(), rest.as_str()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses `key=value` creation parameters.
///
/// Quoted strings have `_` turned into spaces and `\"` unescaped; numbers
/// with a decimal point become floats, other numbers integers. Anything
/// else is skipped.
fn parse_create_params<'s, I>(params: I) -> Map<String, Value>
where
    I: Iterator<Item = &'s str>,
{
    let mut attrs = Map::new();
    for param in params {
        let Some(caps) = create_param().captures(param) else {
            tracing::debug!(param, "skipping create parameter");
            continue;
        };
        let key = caps[1].to_string();
        let value = if let Some(text) = caps.name("str") {
            let inner = &text.as_str()[1..text.as_str().len() - 1];
            Some(Value::String(inner.replace('_', " ").replace("\\\"", "\"")))
        } else if let Some(float) = caps.name("float") {
            float
                .as_str()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
        } else {
            caps.name("int")
                .and_then(|int| int.as_str().parse::<i64>().ok())
                .map(Value::from)
        };
        if let Some(value) = value {
            attrs.insert(key, value);
        }
    }
    attrs
}

/// Parses a `{...}` update argument, accepting single-quoted keys and values.
fn parse_dict(text: &str) -> Option<Map<String, Value>> {
    if !(text.starts_with('{') && text.ends_with('}')) {
        return None;
    }
    serde_json::from_str(&text.replace('\'', "\"")).ok()
}

/// Splits `<name> <value>`, where either part may be double-quoted.
fn parse_update_pair(text: &str) -> (String, String) {
    let mut rest = text;
    let mut name = String::new();
    if let Some(quoted) = rest.strip_prefix('"') {
        let end = quoted.find('"').unwrap_or(quoted.len());
        name = quoted[..end].to_string();
        rest = quoted.get(end + 1..).unwrap_or("");
    }

    let (first, tail) = rest.split_once(' ').unwrap_or((rest, ""));
    if name.is_empty() {
        name = first.to_string();
    }
    let tail = tail.trim_start();
    let value = match tail.strip_prefix('"') {
        Some(quoted) => &quoted[..quoted.find('"').unwrap_or(quoted.len())],
        None => tail.split(' ').next().unwrap_or(""),
    };
    (name, value.to_string())
}

/// Casts numeric attributes to their declared type.
#[allow(clippy::cast_possible_truncation)]
fn cast_attribute(name: &str, value: Value) -> Result<Value> {
    let invalid = |value: &Value| {
        Error::from(CommandError::InvalidArgument(format!(
            "{name} expects a number, got {value}"
        )))
    };

    if INT_ATTRIBUTES.contains(&name) {
        let cast = match &value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        return cast.map(Value::from).ok_or_else(|| invalid(&value));
    }
    if FLOAT_ATTRIBUTES.contains(&name) {
        let cast = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        return cast
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| invalid(&value));
    }
    Ok(value)
}
