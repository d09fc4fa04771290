use once_cell::sync::Lazy;
use regex::Regex;

use crate::documents::DocumentDescriptor;

static PDF_EXT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").expect("pdf regex"));
static REPORT_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)RPT_SafetyMeasures_").expect("report prefix regex"));
static VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)_v\d+\.\d+$").expect("version regex"));

/// `RPT_SafetyMeasures_S1-Panagias_v1.2.pdf` -> `S1 Panagias`
pub fn extract_site_name(filename: &str) -> String {
    let name = PDF_EXT_RE.replace(filename, "");
    let name = REPORT_PREFIX_RE.replace(&name, "");
    let name = VERSION_RE.replace(&name, "");
    name.replace(['_', '-'], " ").trim().to_string()
}

fn format_size_kb(size: Option<u64>) -> String {
    match size {
        Some(bytes) => format!("{:.1}", bytes as f64 / 1024.0),
        None => "Inconnu".to_string(),
    }
}

fn document_section(documents: &[DocumentDescriptor]) -> String {
    if documents.is_empty() {
        return "\n\nNote : La liste des documents est en cours de chargement. Vous avez accès à plusieurs rapports d'innovation de différents sites de concession.".to_string();
    }

    let lines: Vec<String> = documents
        .iter()
        .enumerate()
        .map(|(index, doc)| {
            format!(
                "{}. {} ({}) - {} KB",
                index + 1,
                doc.name,
                extract_site_name(&doc.name),
                format_size_kb(doc.size)
            )
        })
        .collect();

    format!(
        "\n\nDOCUMENTS DISPONIBLES DANS LE RÉFÉRENTIEL :\n{}\n\nTotal : {} rapports d'innovation disponibles pour l'analyse.",
        lines.join("\n"),
        documents.len()
    )
}

/// One-line overview of the catalog, logged at start-up.
pub fn document_summary(documents: &[DocumentDescriptor]) -> String {
    let sites: Vec<String> = documents.iter().map(|doc| extract_site_name(&doc.name)).collect();
    format!(
        "J'ai accès à {} rapports d'innovation : {}",
        documents.len(),
        sites.join(", ")
    )
}

/// The instruction text sent as the first message of every request.
pub fn build_system_prompt(documents: &[DocumentDescriptor]) -> String {
    format!(
        "Vous êtes un agent IA chargé d'analyser tous les documents disponibles sur le site Egis Operations. Votre objectif principal est d'identifier et de résumer les rapports liés à l'innovation provenant des sites de concession.
{}

Tâche
Lors de la consultation des rapports PDF (rédigés en grec), vous devez :

- Traduire le contenu pertinent en français.
- Extraire les informations clés.
- Présenter vos résultats dans un format standardisé.

Axes d'analyse
Concentrez-vous sur :

- Les initiatives d'innovation
- Les solutions technologiques déployées
- Les améliorations opérationnelles
- Les mesures de durabilité
- Les enseignements et recommandations

Format de sortie attendu
Titre : Rapport d'innovation – [Nom du site de concession]

1. Résumé exécutif
   Brève présentation du site et du contexte
   Principaux points

2. Initiatives d'innovation
   Description des nouvelles technologies ou processus
   Objectifs et résultats attendus

3. Détails de mise en œuvre
   Calendrier et phases
   Parties prenantes impliquées
   Ressources mobilisées

4. Résultats & Impact
   Résultats quantitatifs (KPIs, métriques)
   Résultats qualitatifs (expérience utilisateur, efficacité opérationnelle)

5. Durabilité & Scalabilité
   Bénéfices environnementaux ou sociaux
   Potentiel de réplication sur d'autres sites

6. Défis & Enseignements
   Obstacles rencontrés
   Solutions appliquées
   Recommandations pour les projets futurs

7. Conclusion
   Évaluation globale du succès de l'innovation
   Prochaines étapes ou perspectives

Notes d'utilisation
- Si une synthèse générale de tous les rapports est demandée, l'agent doit agréger les résultats par site et mettre en évidence les thèmes récurrents (ex. durabilité, digitalisation, gains d'efficacité).
- Si un site spécifique est demandé, l'agent doit filtrer et présenter uniquement le rapport correspondant, en respectant la même structure.
- Le ton doit rester professionnel, concis et analytique.
- L'agent ne peut pas consulter de sites externes : seules les sources spécifiées (rapports PDF) doivent être utilisées.
- Lors de la liste d'éléments, utilisez des puces commençant par \"-\" pour qu'elles s'affichent avec le logo Egis.",
        document_section(documents)
    )
}
