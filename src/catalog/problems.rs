//! Prospect situations and goals shown in the document context section

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextItem {
    pub id: &'static str,
    pub label: &'static str,
    pub short_label: &'static str,
}

pub static PROBLEMS: &[ContextItem] = &[
    ContextItem {
        id: "no-site",
        label: "Pas de site internet actuellement",
        short_label: "Pas de site web",
    },
    ContextItem {
        id: "old-site",
        label: "Site internet vieillissant ou obsolète",
        short_label: "Site vieux/obsolète",
    },
    ContextItem {
        id: "no-leads",
        label: "Pas assez de demandes entrantes",
        short_label: "Pas de demandes",
    },
    ContextItem {
        id: "not-mobile",
        label: "Site non adapté aux mobiles",
        short_label: "Pas mobile-friendly",
    },
];

pub static GOALS: &[ContextItem] = &[
    ContextItem {
        id: "more-calls",
        label: "Recevoir plus d'appels de prospects",
        short_label: "Plus d'appels",
    },
    ContextItem {
        id: "more-quotes",
        label: "Obtenir plus de demandes de devis",
        short_label: "Plus de devis",
    },
    ContextItem {
        id: "bookings",
        label: "Permettre les réservations en ligne",
        short_label: "Réservations en ligne",
    },
    ContextItem {
        id: "credibility",
        label: "Améliorer ma crédibilité professionnelle",
        short_label: "Plus de crédibilité",
    },
];

pub fn get_problem(id: &str) -> Option<&'static ContextItem> {
    PROBLEMS.iter().find(|p| p.id == id)
}

pub fn get_goal(id: &str) -> Option<&'static ContextItem> {
    GOALS.iter().find(|g| g.id == id)
}
