/// POP3 command verbs
///
/// Verbs are matched case-insensitively. TOP, UIDL and APOP are recognised
/// so they can be refused as unimplemented rather than unrecognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pop3Command {
    Quit,
    User,
    Pass,
    Stat,
    List,
    Retr,
    Rset,
    Noop,
    Dele,
    Top,
    Uidl,
    Apop,
    Unknown(String),
}

impl Pop3Command {
    pub fn from_verb(verb: &str) -> Self {
        match verb.to_uppercase().as_str() {
            "QUIT" => Pop3Command::Quit,
            "USER" => Pop3Command::User,
            "PASS" => Pop3Command::Pass,
            "STAT" => Pop3Command::Stat,
            "LIST" => Pop3Command::List,
            "RETR" => Pop3Command::Retr,
            "RSET" => Pop3Command::Rset,
            "NOOP" => Pop3Command::Noop,
            "DELE" => Pop3Command::Dele,
            "TOP" => Pop3Command::Top,
            "UIDL" => Pop3Command::Uidl,
            "APOP" => Pop3Command::Apop,
            _ => Pop3Command::Unknown(verb.to_string()),
        }
    }
}

/// A tokenized command line: the verb plus its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub command: Pop3Command,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Split a line on whitespace runs; `None` for a line with no words
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = tokenize(line).into_iter();
        let verb = words.next()?;

        Some(Self {
            command: Pop3Command::from_verb(&verb),
            args: words.collect(),
        })
    }
}

pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Parse a message number the way C `atoi` does
///
/// Leading whitespace and an optional sign are accepted, then as many
/// decimal digits as follow. Anything unparsable (and any negative value)
/// yields 0, which is never a valid ordinal.
pub fn parse_ordinal(arg: &str) -> usize {
    let arg = arg.trim_start();
    let (negative, digits) = match arg.as_bytes().first() {
        Some(b'-') => (true, &arg[1..]),
        Some(b'+') => (false, &arg[1..]),
        _ => (false, arg),
    };

    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0usize, |acc, digit| {
            acc.saturating_mul(10).saturating_add(usize::from(digit - b'0'))
        });

    if negative {
        0
    } else {
        value
    }
}
