use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    Ru,
    Th,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ru => "ru",
            Self::Th => "th",
        }
    }

    /// Script-based guess: any Cyrillic letter means Russian, any Thai letter
    /// means Thai, everything else is treated as English.
    pub fn detect(text: &str) -> Self {
        let mut has_thai = false;
        for character in text.chars() {
            match character {
                '\u{0400}'..='\u{04FF}' => return Self::Ru,
                '\u{0E00}'..='\u{0E7F}' => has_thai = true,
                _ => {}
            }
        }
        if has_thai {
            Self::Th
        } else {
            Self::En
        }
    }

    pub fn fallback_reply(&self) -> &'static str {
        match self {
            Self::En => "Sorry, I can't answer right now. A staff member will get back to you shortly.",
            Self::Ru => "Извините, сейчас не могу ответить. Сотрудник скоро с вами свяжется.",
            Self::Th => "ขออภัย ตอนนี้ยังตอบไม่ได้ เจ้าหน้าที่จะติดต่อกลับโดยเร็ว",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "ru" => Ok(Self::Ru),
            "th" => Ok(Self::Th),
            other => Err(format!("unsupported language `{other}` (expected en|ru|th)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Language;

    #[test]
    fn detects_script() {
        assert_eq!(Language::detect("Хочу 5 грамм"), Language::Ru);
        assert_eq!(Language::detect("สวัสดีครับ"), Language::Th);
        assert_eq!(Language::detect("hello 20g"), Language::En);
        assert_eq!(Language::detect(""), Language::En);
    }

    #[test]
    fn parses_tags() {
        assert_eq!("RU".parse::<Language>(), Ok(Language::Ru));
        assert!("de".parse::<Language>().is_err());
    }
}
