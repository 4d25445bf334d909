//! Synthetic identifiers and Spanish-flavored filler attributes.
//!
//! All generation is deterministic (same RNG seed = same output).
//! Identifiers are plain numbers drawn from a sparse window, in the manner
//! of a national ID without its check digit. They are not unique by
//! construction: a collision is dropped by the store's conflict-ignore
//! insert, which is accepted.

use crate::{
    rng::PhaseRng,
    types::{EntityId, IdWindow},
};

/// A generated display name and email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub email: String,
}

pub struct AttributeGenerator;

impl AttributeGenerator {
    /// Draw an identifier uniformly from `window`.
    pub fn generate_identifier(rng: &mut PhaseRng, window: IdWindow) -> EntityId {
        window.start + rng.next_u64_below(window.len.max(1) as u64) as i64
    }

    pub fn generate_profile(rng: &mut PhaseRng) -> Profile {
        let first = Self::pick(rng, FIRST_NAMES);
        let last = Self::pick(rng, LAST_NAMES);
        // Two surnames about half the time.
        let name = if rng.chance(0.5) {
            format!("{first} {last} {}", Self::pick(rng, LAST_NAMES))
        } else {
            format!("{first} {last}")
        };
        let domain = Self::pick(rng, EMAIL_DOMAINS);
        let suffix = rng.next_u64_below(100);
        let email = format!(
            "{}.{}{suffix}@{domain}",
            ascii_slug(first),
            ascii_slug(last)
        );
        Profile { name, email }
    }

    /// A capitalized sentence of `words` words ending in a period.
    pub fn generate_sentence(rng: &mut PhaseRng, words: usize) -> String {
        let words = words.max(1);
        let mut out = String::new();
        for i in 0..words {
            let word = Self::pick(rng, WORDS);
            if i == 0 {
                let mut chars = word.chars();
                if let Some(c) = chars.next() {
                    out.extend(c.to_uppercase());
                    out.push_str(chars.as_str());
                }
            } else {
                out.push(' ');
                out.push_str(word);
            }
        }
        out.push('.');
        out
    }

    /// A title: a short sentence without the trailing period.
    pub fn generate_title(rng: &mut PhaseRng, words: usize) -> String {
        let mut title = Self::generate_sentence(rng, words);
        title.pop();
        title
    }

    /// A paragraph of `sentence_count` sentences of 4 to 10 words each.
    pub fn generate_text(rng: &mut PhaseRng, sentence_count: usize) -> String {
        (0..sentence_count.max(1))
            .map(|_| {
                let words = rng.range_inclusive(4, 10) as usize;
                Self::generate_sentence(rng, words)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn pick(rng: &mut PhaseRng, items: &'static [&'static str]) -> &'static str {
        items[rng.index(items.len())]
    }
}

/// Lowercase ASCII form of a name, for email local parts.
fn ascii_slug(s: &str) -> String {
    s.chars()
        .filter_map(|c| {
            let c = match c {
                'á' | 'Á' => 'a',
                'é' | 'É' => 'e',
                'í' | 'Í' => 'i',
                'ó' | 'Ó' => 'o',
                'ú' | 'Ú' | 'ü' | 'Ü' => 'u',
                'ñ' | 'Ñ' => 'n',
                c => c,
            };
            c.is_ascii_alphanumeric().then(|| c.to_ascii_lowercase())
        })
        .collect()
}

const FIRST_NAMES: &[&str] = &[
    "Alejandro", "Andrés", "Antonio", "Carlos", "Cristóbal", "Daniel", "Diego", "Eduardo",
    "Emilio", "Felipe", "Fernando", "Francisco", "Gabriel", "Gonzalo", "Ignacio", "Javier",
    "Joaquín", "Jorge", "José", "Juan", "Luis", "Manuel", "Marcos", "Martín", "Matías",
    "Miguel", "Nicolás", "Pablo", "Pedro", "Rafael", "Ramón", "Raúl", "Rodrigo", "Sebastián",
    "Sergio", "Tomás", "Vicente", "Agustina", "Alicia", "Ana", "Beatriz", "Camila",
    "Carmen", "Carolina", "Catalina", "Claudia", "Constanza", "Daniela", "Elena", "Florencia",
    "Francisca", "Gabriela", "Isabel", "Javiera", "Josefa", "Laura", "Lucía", "Marta",
    "María", "Martina", "Natalia", "Paula", "Pilar", "Raquel", "Rocío", "Sofía",
    "Teresa", "Valentina", "Verónica", "Ximena",
];

const LAST_NAMES: &[&str] = &[
    "González", "Muñoz", "Rojas", "Díaz", "Pérez", "Soto", "Contreras", "Silva",
    "Martínez", "Sepúlveda", "Morales", "Rodríguez", "López", "Fuentes", "Hernández",
    "Torres", "Araya", "Flores", "Espinoza", "Valenzuela", "Castillo", "Tapia", "Reyes",
    "Gutiérrez", "Castro", "Pizarro", "Álvarez", "Vásquez", "Sánchez", "Fernández",
    "Ramírez", "Carrasco", "Gómez", "Cortés", "Herrera", "Núñez", "Jara", "Vergara",
    "Rivera", "Figueroa", "Riquelme", "García", "Miranda", "Bravo", "Vera", "Molina",
    "Vega", "Campos", "Sandoval", "Orellana", "Zúñiga", "Olivares", "Alarcón", "Gallardo",
    "Ortiz", "Garrido", "Salazar", "Guzmán", "Henríquez", "Saavedra", "Navarro", "Aguilera",
    "Parra", "Romero", "Aravena", "Vargas", "Cáceres", "Yáñez", "Leiva", "Escobar",
];

const EMAIL_DOMAINS: &[&str] = &[
    "example.com", "example.org", "example.net", "correo.example", "mail.example",
];

const WORDS: &[&str] = &[
    "acceso", "actualizar", "ajuste", "alerta", "análisis", "archivo", "aviso", "botón",
    "búsqueda", "cambio", "campo", "carga", "cliente", "código", "configuración", "consulta",
    "contraseña", "correo", "cuenta", "datos", "descarga", "detalle", "error", "estado",
    "exportar", "fecha", "filtro", "flujo", "formulario", "función", "historial", "informe",
    "inicio", "integración", "interfaz", "lista", "mensaje", "módulo", "nuevo", "opción",
    "página", "panel", "pantalla", "permiso", "perfil", "proceso", "pago", "registro",
    "respuesta", "resumen", "revisar", "rendimiento", "servicio", "sesión", "sistema",
    "soporte", "tabla", "tiempo", "usuario", "validar", "valor", "vista", "ventana",
    "el", "la", "de", "en", "con", "para", "por", "sin", "al", "del", "un", "una",
    "rápido", "lento", "correcto", "principal", "seguro", "móvil", "web", "nuevo",
];
