//! Read-only catalog of physiotherapists offering home visits.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Physiotherapist {
    pub id: &'static str,
    pub name: &'static str,
    pub specialty: &'static str,
    pub experience_years: u32,
    pub rating: f32,
    pub price: f64,
    pub available: bool,
    pub bio: &'static str,
}

const fn physio(
    id: &'static str,
    name: &'static str,
    specialty: &'static str,
    experience_years: u32,
    rating: f32,
    price: f64,
    bio: &'static str,
) -> Physiotherapist {
    Physiotherapist {
        id,
        name,
        specialty,
        experience_years,
        rating,
        price,
        available: true,
        bio,
    }
}

static PHYSIOTHERAPISTS: [Physiotherapist; 18] = [
    physio("physio_1", "Dr. Carlos Silva", "Ortopedia", 8, 4.9, 120.0,
        "Especialista em fisioterapia ortopédica com foco em reabilitação pós-cirúrgica."),
    physio("physio_2", "Dra. Ana Costa", "Neurologia", 12, 4.8, 150.0,
        "Fisioterapeuta neurológica com especialização em AVC e lesões medulares."),
    physio("physio_3", "Dr. Pedro Oliveira", "Esportiva", 6, 4.7, 100.0,
        "Especialista em fisioterapia esportiva e prevenção de lesões."),
    physio("physio_4", "Dra. Maria Santos", "Geriatria", 10, 4.9, 130.0,
        "Fisioterapeuta geriátrica com foco em mobilidade e qualidade de vida."),
    physio("physio_5", "Dr. João Lima", "RPG", 7, 4.6, 110.0,
        "Especialista em RPG (Reeducação Postural Global) e pilates terapêutico."),
    physio("physio_6", "Dra. Lucia Ferreira", "Pediatria", 9, 4.8, 140.0,
        "Fisioterapeuta pediátrica especializada em desenvolvimento motor infantil."),
    physio("physio_7", "Dr. Roberto Silva", "Ortopedia", 15, 4.9, 130.0,
        "Especialista em ortopedia com foco em coluna vertebral e articulações."),
    physio("physio_8", "Dra. Fernanda Rocha", "Ortopedia", 11, 4.7, 125.0,
        "Fisioterapeuta ortopédica especializada em lesões de joelho e quadril."),
    physio("physio_9", "Dr. André Martins", "Neurologia", 14, 4.8, 160.0,
        "Neurologista com especialização em Parkinson e esclerose múltipla."),
    physio("physio_10", "Dra. Camila Nunes", "Neurologia", 9, 4.6, 145.0,
        "Especialista em reabilitação neurológica pós-trauma."),
    physio("physio_11", "Dr. Bruno Alves", "Esportiva", 8, 4.8, 115.0,
        "Fisioterapeuta esportivo com experiência em atletas profissionais."),
    physio("physio_12", "Dra. Juliana Castro", "Esportiva", 7, 4.5, 105.0,
        "Especialista em prevenção e tratamento de lesões esportivas."),
    physio("physio_13", "Dr. Sérgio Barbosa", "Geriatria", 16, 4.9, 135.0,
        "Geriatra com foco em fisioterapia preventiva para idosos."),
    physio("physio_14", "Dra. Regina Campos", "Geriatria", 13, 4.7, 128.0,
        "Especialista em reabilitação geriátrica e cuidados domiciliares."),
    physio("physio_15", "Dr. Marcos Pereira", "RPG", 10, 4.8, 118.0,
        "Especialista em RPG e correção postural avançada."),
    physio("physio_16", "Dra. Patrícia Gomes", "RPG", 8, 4.6, 112.0,
        "Fisioterapeuta RPG com foco em dores crônicas e postura."),
    physio("physio_17", "Dr. Rafael Souza", "Pediatria", 11, 4.8, 145.0,
        "Pediatra especializado em fisioterapia respiratória infantil."),
    physio("physio_18", "Dra. Carla Mendes", "Pediatria", 7, 4.7, 138.0,
        "Fisioterapeuta pediátrica com foco em desenvolvimento neuromotor."),
];

pub fn all() -> &'static [Physiotherapist] {
    &PHYSIOTHERAPISTS
}

pub fn find(id: &str) -> Option<&'static Physiotherapist> {
    PHYSIOTHERAPISTS.iter().find(|p| p.id == id)
}

pub fn by_specialty(specialty: &str) -> Vec<&'static Physiotherapist> {
    let wanted = specialty.trim().to_lowercase();
    PHYSIOTHERAPISTS
        .iter()
        .filter(|p| p.specialty.to_lowercase() == wanted)
        .collect()
}

/// Case-insensitive substring match on name or specialty, best rated first.
pub fn search(query: &str) -> Vec<&'static Physiotherapist> {
    let query = query.trim().to_lowercase();
    let mut found: Vec<&'static Physiotherapist> = PHYSIOTHERAPISTS
        .iter()
        .filter(|p| {
            query.is_empty()
                || p.name.to_lowercase().contains(&query)
                || p.specialty.to_lowercase().contains(&query)
        })
        .collect();
    found.sort_by(|a, b| b.rating.total_cmp(&a.rating));
    found
}

pub fn specialties() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = PHYSIOTHERAPISTS.iter().map(|p| p.specialty).collect();
    names.sort_unstable();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<&str> = all().iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), all().len());
    }

    #[test]
    fn finds_by_id_and_specialty() {
        assert_eq!(find("physio_2").map(|p| p.name), Some("Dra. Ana Costa"));
        assert!(find("physio_99").is_none());
        assert_eq!(by_specialty("ortopedia").len(), 3);
        assert_eq!(
            specialties(),
            ["Esportiva", "Geriatria", "Neurologia", "Ortopedia", "Pediatria", "RPG"]
        );
    }

    #[test]
    fn search_matches_name_or_specialty_best_rated_first() {
        let results = search("silva");
        let names: Vec<&str> = results.iter().map(|p| p.name).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Dr. Carlos Silva"));

        let neuro = search("NEURO");
        assert_eq!(neuro.len(), 3);
        assert!(neuro.windows(2).all(|w| w[0].rating >= w[1].rating));

        assert_eq!(search("").len(), all().len());
    }
}
