use log::trace;

use crate::{Device, Error, NameWithId, Result, Slot, device::DeviceBuilder, hex::parse_hex};

use super::Parser;

/// Parser for the one-line-per-device format of `lspci -mm`:
///
/// ```text
/// 00:1c.3 "PCI bridge [0604]" "Intel Corporation [8086]" "82801 PCI Bridge [244e]" -rd5 -p01 "Intel Corporation [8086]" "82801 PCI Bridge [244e]"
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleParser;

#[derive(Debug, PartialEq, Eq)]
struct Token {
    text: String,
    quoted: bool,
}

/// Splits a line into words the way a POSIX shell would.
fn tokenize(line: &str) -> Result<Vec<Token>, &'static str> {
    let mut tokens = Vec::new();
    let mut current: Option<Token> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => tokens.extend(current.take()),
            '\\' => {
                let escaped = chars.next().ok_or("trailing backslash")?;
                current.get_or_insert_with(Token::empty).text.push(escaped);
            }
            '\'' => {
                let token = current.get_or_insert_with(Token::empty);
                token.quoted = true;
                loop {
                    match chars.next().ok_or("unterminated single quote")? {
                        '\'' => break,
                        c => token.text.push(c),
                    }
                }
            }
            '"' => {
                let token = current.get_or_insert_with(Token::empty);
                token.quoted = true;
                loop {
                    match chars.next().ok_or("unterminated double quote")? {
                        '"' => break,
                        '\\' => {
                            let escaped = chars.next().ok_or("unterminated double quote")?;
                            if !matches!(escaped, '"' | '\\' | '$' | '`' | '\n') {
                                token.text.push('\\');
                            }
                            token.text.push(escaped);
                        }
                        c => token.text.push(c),
                    }
                }
            }
            c => current.get_or_insert_with(Token::empty).text.push(c),
        }
    }
    tokens.extend(current);
    Ok(tokens)
}

impl Token {
    fn empty() -> Self {
        Self {
            text: String::new(),
            quoted: false,
        }
    }
}

fn parse_hex_option(flag: char, value: &str) -> Result<u8, String> {
    parse_hex(value).ok_or_else(|| format!("invalid value {value:?} for -{flag}"))
}

impl SimpleParser {
    /// Parses a single line of `lspci -mm` output.
    pub fn parse_line(&self, line: &str) -> Result<Device> {
        let tokens = tokenize(line).map_err(|message| Error::parse(1, message))?;
        self.parse_tokens(tokens).map_err(|message| Error::parse(1, message))
    }

    /// Parses a line that was already split into words. Words starting with
    /// `-` are treated as options.
    pub fn parse_words<S: AsRef<str>>(&self, words: &[S]) -> Result<Device> {
        let tokens = words.iter().map(|word| Token {
            text: word.as_ref().to_owned(),
            quoted: false,
        });
        self.parse_tokens(tokens).map_err(|message| Error::parse(1, message))
    }

    fn parse_tokens(&self, tokens: impl IntoIterator<Item = Token>) -> Result<Device, String> {
        let mut builder = DeviceBuilder::default();
        let mut positional = Vec::new();
        let mut tokens = tokens.into_iter();

        while let Some(token) = tokens.next() {
            // Options only ever follow the slot and are never quoted
            if token.quoted || positional.is_empty() || !token.text.starts_with('-') {
                positional.push(token.text);
                continue;
            }
            let option = &token.text[1..];

            let mut chars = option.chars();
            let flag = chars.next().ok_or("empty option")?;
            let attached = chars.as_str();
            let value = if attached.is_empty() {
                tokens
                    .next()
                    .ok_or_else(|| format!("missing value for -{flag}"))?
                    .text
            } else {
                attached.to_owned()
            };

            match flag {
                'r' => builder.revision = Some(parse_hex_option(flag, &value)?),
                'p' => builder.progif = Some(parse_hex_option(flag, &value)?),
                _ => return Err(format!("unknown option -{option}")),
            }
        }

        if !(4..=6).contains(&positional.len()) {
            return Err(format!(
                "expected 4 to 6 fields, found {}",
                positional.len()
            ));
        }

        let mut positional = positional.into_iter();
        let slot = positional.next().unwrap_or_default();
        builder.slot = Some(slot.parse::<Slot>().map_err(|e| e.to_string())?);
        let mut next = || positional.next().map(|text| NameWithId::from(text.as_str()));
        builder.cls = next();
        builder.vendor = next();
        builder.device = next();
        builder.subsystem_vendor = next();
        builder.subsystem_device = next();

        let device = builder.build().map_err(|field| format!("missing {field}"))?;
        trace!("Parsed {device}");
        Ok(device)
    }
}

impl Parser for SimpleParser {
    fn parse(&self, data: &str) -> Result<Vec<Device>> {
        data.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                let tokens = tokenize(line).map_err(|message| Error::parse(i + 1, message))?;
                self.parse_tokens(tokens)
                    .map_err(|message| Error::parse(i + 1, message))
            })
            .collect()
    }
}
