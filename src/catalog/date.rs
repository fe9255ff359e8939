use chrono::{Datelike, NaiveDate};

use super::Locale;

/// Western zodiac signs, starting with the one that spans new year.
const SIGNS: [(&str, &str); 12] = [
    ("Oğlak", "Capricorn"),
    ("Kova", "Aquarius"),
    ("Balık", "Pisces"),
    ("Koç", "Aries"),
    ("Boğa", "Taurus"),
    ("İkizler", "Gemini"),
    ("Yengeç", "Cancer"),
    ("Aslan", "Leo"),
    ("Başak", "Virgo"),
    ("Terazi", "Libra"),
    ("Akrep", "Scorpio"),
    ("Yay", "Sagittarius"),
];

/// Day of each month on which the next sign begins.
const CUSPS: [u32; 12] = [20, 19, 21, 20, 21, 21, 23, 23, 23, 23, 22, 22];

/// Full years between `birth` and `on`. `None` if `on` precedes `birth`.
pub fn calculate_age(birth: NaiveDate, on: NaiveDate) -> Option<u32> {
    let mut age = on.year() - birth.year();
    if (on.month(), on.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    u32::try_from(age).ok()
}

pub fn zodiac_sign(date: NaiveDate, locale: Locale) -> &'static str {
    let month = date.month() as usize;
    let idx = if date.day() >= CUSPS[month - 1] {
        month % 12
    } else {
        month - 1
    };
    let (tr, en) = SIGNS[idx];
    match locale {
        Locale::Tr => tr,
        Locale::En => en,
    }
}
