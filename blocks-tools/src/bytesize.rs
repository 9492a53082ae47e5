use lazy_regex::{regex, Lazy};
use regex::Regex;

/// Размер в байтах: `123`, `64k`, `64kb`, `1 mb`, `2G`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ByteSize(pub usize);

static PLAIN: &Lazy<Regex> = regex!(r##"^(?<num>\d+)$"##);
static KB: &Lazy<Regex> = regex!(r##"^(?i)(?<num>\d+)\s*kb?$"##);
static MB: &Lazy<Regex> = regex!(r##"^(?i)(?<num>\d+)\s*mb?$"##);
static GB: &Lazy<Regex> = regex!(r##"^(?i)(?<num>\d+)\s*gb?$"##);

fn number(re: &Regex, text: &str, mult: usize) -> Option<Result<usize, String>> {
    re.captures(text).and_then(|c| c.name("num")).map(|num| {
        num.as_str()
            .parse::<usize>()
            .map_err(|err| format!("can't parse {text}: {err}"))
            .and_then(|n| {
                n.checked_mul(mult)
                    .ok_or_else(|| format!("size {text} overflow"))
            })
    })
}

impl ByteSize {
    pub fn parse(text: &str) -> Result<ByteSize, String> {
        let text = text.trim();
        let size = number(PLAIN, text, 1)
            .or_else(|| number(KB, text, 1024))
            .or_else(|| number(MB, text, 1024 * 1024))
            .or_else(|| number(GB, text, 1024 * 1024 * 1024));

        match size {
            Some(size) => size.map(ByteSize),
            None => Err(format!("can't parse size {text}")),
        }
    }
}

#[test]
fn test_parse() {
    assert_eq!(ByteSize::parse("123"), Ok(ByteSize(123)));
    assert_eq!(ByteSize::parse("12 k"), Ok(ByteSize(12 * 1024)));
    assert_eq!(ByteSize::parse("13k"), Ok(ByteSize(13 * 1024)));
    assert_eq!(ByteSize::parse("14K"), Ok(ByteSize(14 * 1024)));
    assert_eq!(ByteSize::parse("64Kb"), Ok(ByteSize(64 * 1024)));
    assert_eq!(ByteSize::parse("15m"), Ok(ByteSize(15 * 1024 * 1024)));
    assert!(ByteSize::parse("15 pages").is_err());
    assert!(ByteSize::parse("").is_err());
}
