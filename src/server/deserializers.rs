use serde::Deserialize;

// html selects submit their values as strings, so ids and difficulty can come as "3" or 3
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(try_from = "NumberOrString")]
pub struct Stri64(pub i64);

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    String(String),
}

impl TryFrom<NumberOrString> for Stri64 {
    type Error = String;

    fn try_from(value: NumberOrString) -> Result<Self, Self::Error> {
        match value {
            NumberOrString::Number(v) => Ok(Stri64(v)),
            NumberOrString::String(s) => match s.trim().parse::<i64>() {
                Ok(v) => Ok(Stri64(v)),
                Err(_) => Err(format!("Wrong value {s}, can not parse to i64")),
            },
        }
    }
}

impl From<Stri64> for i64 {
    fn from(value: Stri64) -> Self {
        value.0
    }
}
