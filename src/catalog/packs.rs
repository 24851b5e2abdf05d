//! Service packs (fixed-price tiers)

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// Delivery delay used when a pack id is unknown
pub const DEFAULT_TIMELINE_DAYS: u32 = 7;

const HOSTING_NOTE: &str = "Le nom de domaine est enregistré au nom du client. L’hébergement et la maintenance sont proposés via une option Suivi (mensuelle ou annuelle).";

/// A fixed-price service tier with its feature list
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pack {
    pub id: &'static str,
    pub name: &'static str,
    pub base_price: u32,
    pub description: &'static str,
    pub features: &'static [&'static str],
    pub bonuses: &'static [&'static str],
    pub default_timeline_days: u32,
    pub popular: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_price_display: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_timeline_display: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosting_note: Option<&'static str>,
}

pub static PACKS: &[Pack] = &[
    Pack {
        id: "starter",
        name: "Starter \"Présence Express\"",
        base_price: 690,
        description: "Idéal si vous n'avez pas de site et voulez être joignable rapidement.",
        features: &[
            "Site 1 page (présentation + services + avis + contact)",
            "Boutons d'action : Appeler / Itinéraire / Email",
            "Formulaire de contact (anti-spam)",
            "Google Maps + horaires",
            "Mise en ligne + SSL + pages légales",
            "Optimisation technique des images incluse (compression, vitesse)",
        ],
        bonuses: &[
            "1 visuel “bannière” offert (image + mise en page propre)",
            "1 mois de support après mise en ligne (petits ajustements)",
        ],
        default_timeline_days: 5,
        popular: false,
        custom_price_display: None,
        custom_timeline_display: Some("Délai : 3–5 jours"),
        hosting_note: Some(HOSTING_NOTE),
    },
    Pack {
        id: "essential",
        name: "Essentiel \"Vitrine Pro\"",
        base_price: 1290,
        description: "Un vrai site complet pour rassurer et présenter votre activité clairement.",
        features: &[
            "Site 4 à 5 pages (Accueil, Services, À propos, Contact, Mentions)",
            "Optimisation mobile + vitesse",
            "SEO local de base (titres, descriptions, structure)",
            "CTA “Demander un devis / Prendre RDV”",
            "Conseils Google Business Profile",
            "Optimisation technique des images incluse (compression, vitesse)",
        ],
        bonuses: &[
            "Mise en place Google Analytics + Search Console",
            "1 visuel “bannière” offert",
            "1 mois de support après mise en ligne",
        ],
        default_timeline_days: 10,
        popular: true,
        custom_price_display: None,
        custom_timeline_display: Some("Délai : 7–10 jours"),
        hosting_note: Some(HOSTING_NOTE),
    },
    Pack {
        id: "business",
        name: "Business \"Site complet + intégrations\"",
        base_price: 2490,
        description: "Pour une entreprise qui a plusieurs services, du contenu, et des outils à connecter.",
        features: &[
            "Jusqu’à 10 pages (ou 7 pages + 3 pages “services/ville”)",
            "Design premium (mise en page plus travaillée, rendu plus “marque”)",
            "Site rapide + mobile-first",
            "CTA optimisés (Appeler / Devis / Réserver)",
            "SEO renforcé (structure + maillage interne)",
            "Intégrations incluses (au choix : 1 à 3) : Réservation, Newsletter, WhatsApp, Avis, Maps",
            "Optimisation technique des images incluse (compression, vitesse)",
        ],
        bonuses: &[
            "Audit avant/après (mini rapport vitesse + points améliorés)",
            "1 mois de support après mise en ligne",
        ],
        default_timeline_days: 15,
        popular: false,
        custom_price_display: None,
        custom_timeline_display: Some("Délai : 10–20 jours"),
        hosting_note: Some(HOSTING_NOTE),
    },
    Pack {
        id: "custom",
        name: "Sur devis (personnalisé)",
        base_price: 0,
        description: "Quand vous avez un besoin spécifique (site plus grand, fonctionnalités particulières).",
        features: &[
            "RDV 15 min → proposition claire (1 page) avec prix + délai",
            "Mini-audit rapide + recommandations",
            "Proposition 1 page sous 24–48h",
        ],
        bonuses: &[
            "Mini-audit + recommandations",
            "1 visuel bannière offert",
            "1 mois de support après mise en ligne",
        ],
        default_timeline_days: 20,
        popular: false,
        custom_price_display: Some("Sur devis"),
        custom_timeline_display: Some("Délai : Selon projet"),
        hosting_note: Some(HOSTING_NOTE),
    },
];

static PACK_INDEX: Lazy<HashMap<&'static str, &'static Pack>> =
    Lazy::new(|| PACKS.iter().map(|pack| (pack.id, pack)).collect());

/// Look up a pack by id
pub fn get_pack(id: &str) -> Option<&'static Pack> {
    PACK_INDEX.get(id).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_pack() {
        let pack = get_pack("essential").unwrap();
        assert_eq!(pack.base_price, 1290);
        assert_eq!(pack.default_timeline_days, 10);
        assert!(pack.popular);

        assert!(get_pack("platinum").is_none());
    }
}
