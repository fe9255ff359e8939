use serde::Serialize;
use serde_json::{json, Map, Value};

use super::Locale;
use crate::db::{Celebrity, SocialLink};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Alternate {
    pub hreflang: &'static str,
    pub href: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub canonical: String,
    pub alternates: Vec<Alternate>,
}

/// `{base}/{locale}/{section}/{slug}` with the slug percent-encoded.
pub fn localized_url(base_url: &str, locale: Locale, section: &str, slug: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        base_url.trim_end_matches('/'),
        locale,
        section,
        urlencoding::encode(slug)
    )
}

pub fn page_meta(
    base_url: &str,
    locale: Locale,
    section: &str,
    slug: &str,
    title: String,
    description: String,
) -> PageMeta {
    let alternates = Locale::ALL
        .iter()
        .map(|l| Alternate {
            hreflang: l.as_str(),
            href: localized_url(base_url, *l, section, slug),
        })
        .collect();
    PageMeta {
        title,
        description,
        canonical: localized_url(base_url, locale, section, slug),
        alternates,
    }
}

/// schema.org `Person` document for a profile page.
pub fn person_schema(
    base_url: &str,
    locale: Locale,
    celebrity: &Celebrity,
    bio_short: Option<&str>,
    social_links: &[SocialLink],
    tag_slugs: &[String],
) -> Value {
    let url = localized_url(base_url, locale, "u", &celebrity.slug);
    let image = celebrity
        .profile_image_url
        .clone()
        .unwrap_or_else(|| format!("{}/default-avatar.jpg", base_url.trim_end_matches('/')));

    let mut doc = Map::new();
    doc.insert("@context".into(), json!("https://schema.org"));
    doc.insert("@type".into(), json!("Person"));
    doc.insert("@id".into(), json!(format!("{}#person", url)));
    doc.insert("name".into(), json!(celebrity.full_name));
    if let Some(ref nickname) = celebrity.nickname {
        doc.insert("alternateName".into(), json!(nickname));
    }
    if let Some(description) = bio_short.or(celebrity.profession.as_deref()) {
        doc.insert("description".into(), json!(description));
    }
    doc.insert("url".into(), json!(url));
    doc.insert(
        "image".into(),
        json!({
            "@type": "ImageObject",
            "url": image,
            "width": 800,
            "height": 800,
        }),
    );
    if let Some(birth) = celebrity.birth_date {
        doc.insert("birthDate".into(), json!(birth.format("%Y-%m-%d").to_string()));
    }
    if let Some(ref place) = celebrity.birth_place {
        doc.insert("birthPlace".into(), json!({ "@type": "Place", "name": place }));
    }
    if let Some(ref country) = celebrity.country {
        doc.insert("nationality".into(), json!({ "@type": "Country", "name": country }));
    }
    if let Some(ref profession) = celebrity.profession {
        doc.insert("jobTitle".into(), json!(profession));
    }
    let same_as: Vec<&str> = social_links.iter().filter_map(|l| l.url.as_deref()).collect();
    doc.insert("sameAs".into(), json!(same_as));
    doc.insert("knowsAbout".into(), json!(tag_slugs));

    Value::Object(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Visibility;
    use chrono::{NaiveDate, Utc};

    fn tarkan() -> Celebrity {
        let now = Utc::now();
        Celebrity {
            id: 1,
            slug: "tarkan".to_string(),
            first_name: Some("Tarkan".to_string()),
            last_name: Some("Tevetoğlu".to_string()),
            full_name: "Tarkan Tevetoğlu".to_string(),
            nickname: Some("Tarkan".to_string()),
            birth_date: NaiveDate::from_ymd_opt(1972, 10, 17),
            death_date: None,
            birth_place: Some("Alzey".to_string()),
            country: Some("Turkey".to_string()),
            nationality: None,
            profession: Some("Singer".to_string()),
            active_years_start: Some(1992),
            profile_image_url: None,
            cover_image_url: None,
            is_featured: true,
            is_verified: true,
            visibility: Visibility::Published,
            popularity_score: 90.0,
            total_views: 0,
            total_searches: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_page_meta_alternates() {
        let meta = page_meta(
            "https://example.org/",
            Locale::Tr,
            "u",
            "sezen aksu",
            "Sezen Aksu".to_string(),
            String::new(),
        );
        assert_eq!(meta.canonical, "https://example.org/tr/u/sezen%20aksu");
        assert_eq!(meta.alternates.len(), 2);
        assert_eq!(meta.alternates[1].href, "https://example.org/en/u/sezen%20aksu");
    }

    #[test]
    fn test_person_schema() {
        let doc = person_schema(
            "https://example.org",
            Locale::En,
            &tarkan(),
            None,
            &[],
            &["pop".to_string()],
        );
        assert_eq!(doc["@id"], "https://example.org/en/u/tarkan#person");
        assert_eq!(doc["description"], "Singer");
        assert_eq!(doc["birthDate"], "1972-10-17");
        assert_eq!(doc["image"]["url"], "https://example.org/default-avatar.jpg");
        assert_eq!(doc["nationality"]["name"], "Turkey");
        assert_eq!(doc["knowsAbout"][0], "pop");
        assert!(doc["sameAs"].as_array().unwrap().is_empty());
    }
}
