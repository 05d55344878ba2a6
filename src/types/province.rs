//! Static reference data: Spanish provinces with their INE province code and
//! the code of the autonomous community (region) they belong to.

/// A province of the `provincias` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Province {
    /// INE province code (1..=52).
    pub code: i32,
    /// Canonical province name.
    pub name: &'static str,
    /// INE autonomous community code (1..=19).
    pub region_code: i32,
}

const fn province(code: i32, name: &'static str, region_code: i32) -> Province {
    Province {
        code,
        name,
        region_code,
    }
}

pub static PROVINCES: [Province; 52] = [
    province(1, "Araba/Álava", 16),
    province(2, "Albacete", 8),
    province(3, "Alicante/Alacant", 10),
    province(4, "Almería", 1),
    province(5, "Ávila", 7),
    province(6, "Badajoz", 11),
    province(7, "Illes Balears", 4),
    province(8, "Barcelona", 9),
    province(9, "Burgos", 7),
    province(10, "Cáceres", 11),
    province(11, "Cádiz", 1),
    province(12, "Castellón/Castelló", 10),
    province(13, "Ciudad Real", 8),
    province(14, "Córdoba", 1),
    province(15, "A Coruña", 12),
    province(16, "Cuenca", 8),
    province(17, "Girona", 9),
    province(18, "Granada", 1),
    province(19, "Guadalajara", 8),
    province(20, "Gipuzkoa", 16),
    province(21, "Huelva", 1),
    province(22, "Huesca", 2),
    province(23, "Jaén", 1),
    province(24, "León", 7),
    province(25, "Lleida", 9),
    province(26, "La Rioja", 17),
    province(27, "Lugo", 12),
    province(28, "Madrid", 13),
    province(29, "Málaga", 1),
    province(30, "Murcia", 14),
    province(31, "Navarra", 15),
    province(32, "Ourense", 12),
    province(33, "Asturias", 3),
    province(34, "Palencia", 7),
    province(35, "Las Palmas", 5),
    province(36, "Pontevedra", 12),
    province(37, "Salamanca", 7),
    province(38, "Santa Cruz de Tenerife", 5),
    province(39, "Cantabria", 6),
    province(40, "Segovia", 7),
    province(41, "Sevilla", 1),
    province(42, "Soria", 7),
    province(43, "Tarragona", 9),
    province(44, "Teruel", 2),
    province(45, "Toledo", 8),
    province(46, "Valencia/València", 10),
    province(47, "Valladolid", 7),
    province(48, "Bizkaia", 16),
    province(49, "Zamora", 7),
    province(50, "Zaragoza", 2),
    province(51, "Ceuta", 18),
    province(52, "Melilla", 19),
];

/// Spellings used by the provider that differ from the canonical name once folded.
pub const PROVINCE_ALIASES: [(&str, i32); 26] = [
    ("ALAVA", 1),
    ("ARABA", 1),
    ("ARABA/ALAVA", 1),
    ("ALICANTE", 3),
    ("ALACANT", 3),
    ("BALEARES", 7),
    ("ILLES BALEARS", 7),
    ("ISLAS BALEARES", 7),
    ("CASTELLON", 12),
    ("CASTELLO", 12),
    ("CORUÑA", 15),
    ("LA CORUÑA", 15),
    ("A CORUÑA", 15),
    ("GUIPUZCOA", 20),
    ("GERONA", 17),
    ("LERIDA", 25),
    ("ORENSE", 32),
    ("VIZCAYA", 48),
    ("BIZKAIA", 48),
    ("STA. CRUZ DE TENERIFE", 38),
    ("S.C. DE TENERIFE", 38),
    ("TENERIFE", 38),
    ("VALENCIA", 46),
    ("NAVARRA", 31),
    ("ASTURIAS", 33),
    ("LA RIOJA", 26),
];

/// Normalises a province label for lookup: trims, collapses inner whitespace,
/// uppercases and strips accents (keeping `Ñ`).
///
/// # Examples
///
/// ```
/// use aemet_etl::fold_label;
///
/// assert_eq!(fold_label("  Almería "), "ALMERIA");
/// assert_eq!(fold_label("A Coruña"), "A CORUÑA");
/// ```
pub fn fold_label(label: &str) -> String {
    let upper = label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    upper
        .chars()
        .map(|c| match c {
            'Á' | 'À' | 'Ä' | 'Â' => 'A',
            'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
            'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            other => other,
        })
        .collect()
}

/// Looks up a province by its INE code.
pub fn province_by_code(code: i32) -> Option<&'static Province> {
    PROVINCES.iter().find(|p| p.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique_and_dense() {
        let codes: HashSet<i32> = PROVINCES.iter().map(|p| p.code).collect();
        assert_eq!(codes.len(), 52);
        assert!((1..=52).all(|c| codes.contains(&c)));
        assert!(PROVINCES.iter().all(|p| (1..=19).contains(&p.region_code)));
    }

    #[test]
    fn test_aliases_point_to_known_provinces() {
        for (alias, code) in PROVINCE_ALIASES {
            assert!(province_by_code(code).is_some(), "alias {alias} -> {code}");
            assert_eq!(fold_label(alias), alias, "alias {alias} must be pre-folded");
        }
    }

    #[test]
    fn test_fold_label() {
        assert_eq!(fold_label("Cáceres"), "CACERES");
        assert_eq!(fold_label("santa  cruz de   tenerife"), "SANTA CRUZ DE TENERIFE");
        assert_eq!(fold_label("València"), "VALENCIA");
    }
}
