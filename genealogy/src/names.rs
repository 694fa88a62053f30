//! Name lists for synthetic populations

use rand::seq::SliceRandom;
use rand::Rng;

const MALE_FIRST_NAMES: &[&str] = &[
    "Anton", "August", "Bernhard", "Carl", "Christian", "Emil", "Ernst", "Franz", "Friedrich",
    "Georg", "Gustav", "Hans", "Heinrich", "Hermann", "Jakob", "Johann", "Josef", "Karl",
    "Konrad", "Ludwig", "Martin", "Matthias", "Michael", "Nikolaus", "Otto", "Paul", "Peter",
    "Philipp", "Rudolf", "Simon", "Stefan", "Theodor", "Valentin", "Wilhelm",
];

const FEMALE_FIRST_NAMES: &[&str] = &[
    "Agnes", "Amalie", "Anna", "Barbara", "Berta", "Christine", "Dorothea", "Elisabeth", "Emma",
    "Franziska", "Gertrud", "Helene", "Johanna", "Josefa", "Katharina", "Klara", "Luise",
    "Magdalena", "Margarethe", "Maria", "Martha", "Mathilde", "Rosa", "Sophie", "Theresia",
    "Ursula", "Veronika", "Wilhelmine",
];

const LAST_NAMES: &[&str] = &[
    "Bauer", "Becker", "Berger", "Brandt", "Fischer", "Fuchs", "Graf", "Hahn", "Hartmann",
    "Hofmann", "Huber", "Jung", "Kaiser", "Keller", "Koch", "Krause", "Lang", "Lehmann",
    "Maier", "Meyer", "Moser", "Neumann", "Richter", "Roth", "Schmid", "Schneider", "Schulz",
    "Schwarz", "Vogel", "Wagner", "Weber", "Winkler", "Wolf", "Zimmermann",
];

pub fn random_first_name<R: Rng + ?Sized>(rng: &mut R, is_male: bool) -> &'static str {
    let names = if is_male { MALE_FIRST_NAMES } else { FEMALE_FIRST_NAMES };
    names.choose(rng).copied().unwrap_or("Unnamed")
}

pub fn random_last_name<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    LAST_NAMES.choose(rng).copied().unwrap_or("Unknown")
}
