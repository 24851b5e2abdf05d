//! Add-on options priced on top of a pack

use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionCategory {
    Content,
    Visibility,
    Functional,
    Maintenance,
    Other,
}

/// Which packs an option can be added to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    All,
    Packs(&'static [&'static str]),
}

impl Compatibility {
    pub fn allows(&self, pack_id: &str) -> bool {
        match self {
            Compatibility::All => true,
            Compatibility::Packs(ids) => ids.contains(&pack_id),
        }
    }
}

// "all" or the list of pack ids
impl Serialize for Compatibility {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Compatibility::All => serializer.serialize_str("all"),
            Compatibility::Packs(ids) => ids.serialize(serializer),
        }
    }
}

/// An add-on priced separately from the pack
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferOption {
    pub id: &'static str,
    pub label: &'static str,
    pub price: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    pub category: OptionCategory,
    pub compatible_packs: Compatibility,
    pub is_monthly: bool,
}

const WEBSITE_PACKS: &[&str] = &["starter", "essential", "business"];

pub static OPTIONS: &[OfferOption] = &[
    // Content / visuals
    OfferOption {
        id: "copywriting-starter",
        label: "Rédaction des textes (Starter)",
        price: 150,
        description: None,
        category: OptionCategory::Content,
        compatible_packs: Compatibility::Packs(&["starter"]),
        is_monthly: false,
    },
    OfferOption {
        id: "copywriting-essential",
        label: "Rédaction des textes (Essentiel)",
        price: 350,
        description: None,
        category: OptionCategory::Content,
        compatible_packs: Compatibility::Packs(&["essential"]),
        is_monthly: false,
    },
    OfferOption {
        id: "photos-10",
        label: "Retouches & optimisation photos (10)",
        price: 120,
        description: Some("Retouche luminosité/couleurs + compression web"),
        category: OptionCategory::Content,
        compatible_packs: Compatibility::Packs(WEBSITE_PACKS),
        is_monthly: false,
    },
    OfferOption {
        id: "photos-20",
        label: "Retouches & optimisation photos (20)",
        price: 190,
        description: Some("Retouche luminosité/couleurs + compression web"),
        category: OptionCategory::Content,
        compatible_packs: Compatibility::Packs(WEBSITE_PACKS),
        is_monthly: false,
    },
    OfferOption {
        id: "logo-simple",
        label: "Logo simple",
        price: 250,
        description: Some("Création d'un logo simple et efficace (sur devis pour identité complète)"),
        category: OptionCategory::Content,
        compatible_packs: Compatibility::Packs(WEBSITE_PACKS),
        is_monthly: false,
    },
    // Visibility / SEO
    OfferOption {
        id: "seo-reinforced",
        label: "SEO local : 2 pages ciblées (service/ville)",
        price: 390,
        description: None,
        category: OptionCategory::Visibility,
        compatible_packs: Compatibility::Packs(&["essential", "business"]),
        is_monthly: false,
    },
    OfferOption {
        id: "gmb-optimization",
        label: "Google Business optimisation complète",
        price: 150,
        description: None,
        category: OptionCategory::Visibility,
        compatible_packs: Compatibility::Packs(WEBSITE_PACKS),
        is_monthly: false,
    },
    OfferOption {
        id: "google-ads-setup",
        label: "Google Ads (setup 1 campagne)",
        price: 390,
        description: Some("Budget publicitaire non inclus (à payer à Google)"),
        category: OptionCategory::Visibility,
        compatible_packs: Compatibility::Packs(&["essential", "business"]),
        is_monthly: false,
    },
    OfferOption {
        id: "qr-code",
        label: "QR Code + mini affiche",
        price: 60,
        description: Some("QR vers le site + 1 visuel A4 'Réservez / Appelez'"),
        category: OptionCategory::Visibility,
        compatible_packs: Compatibility::Packs(WEBSITE_PACKS),
        is_monthly: false,
    },
    // Functional
    OfferOption {
        id: "newsletter-setup",
        label: "Newsletter setup",
        price: 150,
        description: Some("Brevo/Mailchimp + formulaire + template"),
        category: OptionCategory::Functional,
        compatible_packs: Compatibility::Packs(&["essential"]),
        is_monthly: false,
    },
    OfferOption {
        id: "blog-setup",
        label: "Blog (page blog + modèle article)",
        price: 290,
        description: None,
        category: OptionCategory::Functional,
        compatible_packs: Compatibility::Packs(&["essential", "business", "custom"]),
        is_monthly: false,
    },
    OfferOption {
        id: "multilingual",
        label: "Multilingue (1 langue)",
        price: 250,
        description: None,
        category: OptionCategory::Functional,
        compatible_packs: Compatibility::Packs(&["essential", "business", "custom"]),
        is_monthly: false,
    },
    OfferOption {
        id: "domain-setup",
        label: "Achat + configuration du domaine",
        price: 50,
        description: Some("Le coût annuel du domaine reste payé par le client. Le domaine reste au nom du client (propriétaire)."),
        category: OptionCategory::Functional,
        compatible_packs: Compatibility::Packs(WEBSITE_PACKS),
        is_monthly: false,
    },
    OfferOption {
        id: "page-supp",
        label: "Page standard supplémentaire",
        price: 120,
        description: Some("Page de présentation, réalisation, équipe..."),
        category: OptionCategory::Content,
        compatible_packs: Compatibility::Packs(&["essential", "business", "custom"]),
        is_monthly: false,
    },
    OfferOption {
        id: "section-supp",
        label: "Section supplémentaire (sur la one-page)",
        price: 80,
        description: Some("Ajout d'une section (ex: FAQ, Galerie, Tarifs)"),
        category: OptionCategory::Content,
        compatible_packs: Compatibility::Packs(&["starter"]),
        is_monthly: false,
    },
    OfferOption {
        id: "page-service-supp",
        label: "Page SEO supplémentaire (Service/Ville)",
        price: 150,
        description: Some("Structure optimisée pour le référencement local"),
        category: OptionCategory::Content,
        compatible_packs: Compatibility::Packs(&["business", "custom"]),
        is_monthly: false,
    },
    OfferOption {
        id: "integration-supp",
        label: "Intégration supplémentaire",
        price: 150,
        description: Some("Installation & configuration d'un outil tiers (au-delà des 3 incluses)"),
        category: OptionCategory::Functional,
        compatible_packs: Compatibility::Packs(&["business"]),
        is_monthly: false,
    },
    // Follow-up / maintenance, billed monthly
    OfferOption {
        id: "maintenance-tech",
        label: "Suivi \"Technique\"",
        price: 29,
        description: Some("Hébergement + SSL + sauvegardes + Mises à jour & sécurité (surveillance + correctifs). Bilan annuel (mail rapide). Engagement 3 mois."),
        category: OptionCategory::Maintenance,
        compatible_packs: Compatibility::All,
        is_monthly: true,
    },
    OfferOption {
        id: "maintenance-std",
        label: "Suivi \"Standard\"",
        price: 59,
        description: Some("Tout le technique + 30 min de modifications de contenu + Rapport semestriel. Engagement 3 mois."),
        category: OptionCategory::Maintenance,
        compatible_packs: Compatibility::All,
        is_monthly: true,
    },
    OfferOption {
        id: "maintenance-plus",
        label: "Suivi \"Plus\"",
        price: 99,
        description: Some("Tout le technique + 1h de modifications de contenu + Rapport mensuel. Engagement 3 mois."),
        category: OptionCategory::Maintenance,
        compatible_packs: Compatibility::All,
        is_monthly: true,
    },
    OfferOption {
        id: "maintenance-news",
        label: "1 mise à jour de contenu / mois",
        price: 79,
        description: Some("Modification de texte/photo/horaires/infos. Hors nouvelles pages."),
        category: OptionCategory::Maintenance,
        compatible_packs: Compatibility::All,
        is_monthly: true,
    },
];

static OPTION_INDEX: Lazy<HashMap<&'static str, &'static OfferOption>> =
    Lazy::new(|| OPTIONS.iter().map(|option| (option.id, option)).collect());

/// Look up an option by id
pub fn get_option(id: &str) -> Option<&'static OfferOption> {
    OPTION_INDEX.get(id).copied()
}

/// Options that can be added to the given pack, in catalog order
pub fn options_for_pack(pack_id: &str) -> Vec<&'static OfferOption> {
    OPTIONS
        .iter()
        .filter(|option| option.compatible_packs.allows(pack_id))
        .collect()
}

/// Whether `option_id` exists and can be added to `pack_id`
pub fn is_option_available(pack_id: &str, option_id: &str) -> bool {
    get_option(option_id).is_some_and(|option| option.compatible_packs.allows(pack_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_for_pack_filters_incompatible() {
        let starter: Vec<_> = options_for_pack("starter").iter().map(|o| o.id).collect();
        assert!(starter.contains(&"copywriting-starter"));
        assert!(starter.contains(&"maintenance-tech"));
        assert!(!starter.contains(&"seo-reinforced"));

        let business: Vec<_> = options_for_pack("business").iter().map(|o| o.id).collect();
        assert!(business.contains(&"seo-reinforced"));
        assert!(!business.contains(&"copywriting-starter"));
    }

    #[test]
    fn test_unknown_pack_only_gets_universal_options() {
        let options = options_for_pack("does-not-exist");
        assert!(!options.is_empty());
        assert!(options.iter().all(|o| o.compatible_packs == Compatibility::All));
    }

    #[test]
    fn test_is_option_available() {
        assert!(is_option_available("essential", "seo-reinforced"));
        assert!(!is_option_available("starter", "seo-reinforced"));
        assert!(!is_option_available("essential", "unknown-option"));
    }

    #[test]
    fn test_compatibility_serialization() {
        let all = serde_json::to_value(Compatibility::All).unwrap();
        assert_eq!(all, serde_json::json!("all"));

        let some = serde_json::to_value(Compatibility::Packs(&["starter", "business"])).unwrap();
        assert_eq!(some, serde_json::json!(["starter", "business"]));
    }
}
