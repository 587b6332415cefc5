//! Keyword tables per operating language.
//!
//! Matching is a case-insensitive substring test against every table, so a
//! mixed-language message still hits. Recall is preferred over precision: a
//! false positive costs a redundant staff notification, not a wrong order.

use budtender_core::domain::order::PaymentMethod;
use budtender_core::language::Language;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeywordSet {
    /// Explicit intent to buy.
    Order,
    /// Words that place the surrounding turns in an ordering exchange.
    OrderContext,
    /// Complaints or questions about an order already on its way.
    DeliveryFriction,
    /// Name, hotel and address markers.
    ContactMarker,
    Advice,
    StaffQuestion,
    /// Phrases in the assistant reply that hand the question to a human.
    Deferral,
    Feedback,
}

#[derive(Debug)]
pub struct KeywordTable {
    pub language: Language,
    pub order: &'static [&'static str],
    pub order_context: &'static [&'static str],
    pub delivery_friction: &'static [&'static str],
    pub contact_markers: &'static [&'static str],
    pub advice: &'static [&'static str],
    pub staff_question: &'static [&'static str],
    pub deferral: &'static [&'static str],
    pub feedback: &'static [&'static str],
}

impl KeywordTable {
    pub fn words(&self, set: KeywordSet) -> &'static [&'static str] {
        match set {
            KeywordSet::Order => self.order,
            KeywordSet::OrderContext => self.order_context,
            KeywordSet::DeliveryFriction => self.delivery_friction,
            KeywordSet::ContactMarker => self.contact_markers,
            KeywordSet::Advice => self.advice,
            KeywordSet::StaffQuestion => self.staff_question,
            KeywordSet::Deferral => self.deferral,
            KeywordSet::Feedback => self.feedback,
        }
    }
}

pub const ENGLISH: KeywordTable = KeywordTable {
    language: Language::En,
    order: &[
        "i want",
        "i'd like",
        "i would like",
        "i'll take",
        "i will take",
        "can i get",
        "can i have",
        "order",
        "buy",
        "purchase",
        "send me",
        "bring me",
        "checkout",
    ],
    order_context: &["deliver", "delivery", "how much", "price", "pay", "total"],
    delivery_friction: &[
        "courier",
        "driver",
        "still waiting",
        "on the way",
        "where is my",
        "running late",
        "how long",
        "not arrived",
        "hasn't arrived",
    ],
    contact_markers: &[
        "my name",
        "name:",
        "hotel",
        "address",
        "room",
        "villa",
        "resort",
        "bungalow",
        "my number",
        "phone",
        "whatsapp",
    ],
    advice: &[
        "recommend",
        "suggest",
        "advice",
        "advise",
        "what should",
        "which one",
        "which strain",
        "help me choose",
        "best for",
        "something for",
        "what's good",
        "what is good",
    ],
    staff_question: &[
        "where are you",
        "location",
        "opening hours",
        "working hours",
        "are you open",
        "open today",
        "open now",
        "what time",
        "where is the shop",
        "manager",
        "staff",
        "operator",
        "human",
        "talk to someone",
        "contact you",
    ],
    deferral: &[
        "i'll pass",
        "i will pass",
        "let me check with",
        "staff will",
        "staff member will",
        "manager will",
        "will get back to you",
        "i don't have that information",
        "i don't have this information",
        "contact our team",
        "forward your question",
    ],
    feedback: &[
        "thank",
        "thx",
        "great",
        "awesome",
        "amazing",
        "love it",
        "loved",
        "perfect",
        "excellent",
        "good job",
        "best shop",
    ],
};

pub const RUSSIAN: KeywordTable = KeywordTable {
    language: Language::Ru,
    order: &["хочу", "заказ", "закаж", "куплю", "купить", "возьму", "привезите", "доставьте", "оформ"],
    order_context: &["доставк", "привез", "сколько стоит", "цена", "оплат", "итого"],
    delivery_friction: &["курьер", "долго", "жду", "где мой", "где заказ", "не приехал", "опаздыва"],
    contact_markers: &[
        "меня зовут",
        "имя",
        "отель",
        "гостиниц",
        "адрес",
        "комнат",
        "номер",
        "вилла",
        "телефон",
    ],
    advice: &["посоветуй", "порекоменд", "рекоменд", "что лучше", "какой лучше", "подскаж", "что есть"],
    staff_question: &[
        "где вы",
        "где находит",
        "часы работы",
        "во сколько",
        "работаете",
        "менеджер",
        "оператор",
        "сотрудник",
        "связаться",
    ],
    deferral: &["уточню", "передам", "менеджер свяж", "сотрудник свяж", "нет информации", "не могу ответить"],
    feedback: &["спасибо", "благодар", "отлично", "супер", "класс", "круто"],
};

pub const THAI: KeywordTable = KeywordTable {
    language: Language::Th,
    order: &["สั่ง", "ซื้อ", "อยากได้", "ขอสั่ง"],
    order_context: &["ส่ง", "ราคา", "จ่าย", "เท่าไหร่"],
    delivery_friction: &["ไรเดอร์", "รอนาน", "ถึงไหน", "ยังไม่ได้"],
    contact_markers: &["ชื่อ", "โรงแรม", "ที่อยู่", "ห้อง", "เบอร์"],
    advice: &["แนะนำ", "ตัวไหนดี", "อันไหนดี"],
    staff_question: &["อยู่ที่ไหน", "เปิดกี่โมง", "ปิดกี่โมง", "ติดต่อ", "พนักงาน"],
    deferral: &["จะแจ้ง", "เจ้าหน้าที่จะ", "สอบถามเจ้าหน้าที่"],
    feedback: &["ขอบคุณ", "ดีมาก", "สุดยอด"],
};

pub const TABLES: [&KeywordTable; 3] = [&ENGLISH, &RUSSIAN, &THAI];

/// Synonyms for each accepted payment method, across languages.
pub const PAYMENT_SYNONYMS: &[(PaymentMethod, &[&str])] = &[
    (PaymentMethod::Cash, &["cash", "наличн", "налик", "เงินสด"]),
    (PaymentMethod::Card, &["card", "visa", "mastercard", "картой", "карта", "บัตร"]),
    (PaymentMethod::Crypto, &["crypto", "usdt", "btc", "bitcoin", "крипт", "คริปโต"]),
];

/// Lower-cases once so callers can test several sets against one string.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
}

pub fn first_match(normalized: &str, set: KeywordSet) -> Option<&'static str> {
    TABLES
        .iter()
        .flat_map(|table| table.words(set).iter())
        .find(|keyword| normalized.contains(**keyword))
        .copied()
}

pub fn matches(normalized: &str, set: KeywordSet) -> bool {
    first_match(normalized, set).is_some()
}

pub fn payment_method(normalized: &str) -> Option<PaymentMethod> {
    PAYMENT_SYNONYMS
        .iter()
        .find(|(_, synonyms)| synonyms.iter().any(|synonym| normalized.contains(synonym)))
        .map(|(method, _)| *method)
}

#[cfg(test)]
mod tests {
    use budtender_core::domain::order::PaymentMethod;

    use super::{first_match, matches, normalize, payment_method, KeywordSet, TABLES};

    #[test]
    fn every_table_covers_every_set() {
        let sets = [
            KeywordSet::Order,
            KeywordSet::OrderContext,
            KeywordSet::DeliveryFriction,
            KeywordSet::ContactMarker,
            KeywordSet::Advice,
            KeywordSet::StaffQuestion,
            KeywordSet::Deferral,
            KeywordSet::Feedback,
        ];
        for table in TABLES {
            for set in sets {
                assert!(!table.words(set).is_empty(), "{:?} has no {set:?} words", table.language);
            }
        }
    }

    #[test]
    fn keywords_are_lowercase_so_substring_matching_works() {
        for table in TABLES {
            for set in [KeywordSet::Order, KeywordSet::Advice, KeywordSet::Feedback] {
                for word in table.words(set) {
                    assert_eq!(*word, word.to_lowercase());
                }
            }
        }
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        assert!(matches(&normalize("I WANT some flower"), KeywordSet::Order));
        assert!(matches(&normalize("Хочу заказать"), KeywordSet::Order));
        assert!(matches(&normalize("ขอบคุณครับ"), KeywordSet::Feedback));
        assert_eq!(first_match(&normalize("Thanks a lot"), KeywordSet::Feedback), Some("thank"));
        assert!(!matches(&normalize("hello there"), KeywordSet::Order));
    }

    #[test]
    fn payment_synonyms_resolve_to_methods() {
        assert_eq!(payment_method("cash"), Some(PaymentMethod::Cash));
        assert_eq!(payment_method("оплачу наличными"), Some(PaymentMethod::Cash));
        assert_eq!(payment_method("can i pay in usdt?"), Some(PaymentMethod::Crypto));
        assert_eq!(payment_method("by visa"), Some(PaymentMethod::Card));
        assert_eq!(payment_method("whenever"), None);
    }
}
