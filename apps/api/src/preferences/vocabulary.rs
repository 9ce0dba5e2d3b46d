// Controlled vocabularies for the preference extractor.
// Phrases are matched against normalized text: lowercase, apostrophes removed,
// every other non-alphanumeric character collapsed to a single space.

use crate::models::job::LocationType;

/// Phrases that state a salary floor.
pub const SALARY_THRESHOLDS: &[&str] = &[
    "minimum",
    "at least",
    "min",
    "no less than",
    "or more",
    "or above",
    "starting at",
];

/// Phrases that name salary without a floor. An amount next to one of these only
/// counts when no threshold phrase has an amount of its own.
pub const SALARY_MENTIONS: &[&str] = &["salary", "pay"];

pub const LOCATION_TYPES: &[(&str, LocationType)] = &[
    ("remote", LocationType::Remote),
    ("remotely", LocationType::Remote),
    ("work from home", LocationType::Remote),
    ("wfh", LocationType::Remote),
    ("hybrid", LocationType::Hybrid),
    ("onsite", LocationType::Onsite),
    ("on site", LocationType::Onsite),
    ("in office", LocationType::Onsite),
    ("in the office", LocationType::Onsite),
    ("in person", LocationType::Onsite),
];

pub const TITLES: &[(&[&str], &str)] = &[
    (&["driver", "drivers"], "Driver"),
    (&["engineer", "engineers"], "Engineer"),
    (&["developer", "developers", "programmer"], "Developer"),
    (&["designer", "designers"], "Designer"),
    (&["data scientist", "data scientists"], "Data Scientist"),
    (&["analyst", "analysts"], "Analyst"),
    (&["nurse", "nurses"], "Nurse"),
    (&["teacher", "teachers", "tutor"], "Teacher"),
    (&["manager", "managers"], "Manager"),
    (&["accountant", "accountants"], "Accountant"),
    (&["electrician", "electricians"], "Electrician"),
    (&["mechanic", "mechanics"], "Mechanic"),
    (&["technician", "technicians"], "Technician"),
    (&["cashier", "cashiers"], "Cashier"),
    (&["chef", "chefs", "cook", "cooks"], "Chef"),
    (&["warehouse"], "Warehouse"),
    (&["sales representative", "sales rep", "salesperson"], "Sales Representative"),
    (&["consultant", "consultants"], "Consultant"),
    (&["recruiter", "recruiters"], "Recruiter"),
];

/// Checked in order. A matched phrase is blanked out of the text so that
/// `driver's license` neither yields the generic `License` nor the `Driver` title.
pub const CREDENTIALS: &[(&[&str], &str)] = &[
    (
        &["commercial drivers license", "commercial driver license", "cdl"],
        "CDL",
    ),
    (
        &[
            "drivers license",
            "driver license",
            "driving license",
            "drivers licence",
            "driving licence",
        ],
        "Driver's License",
    ),
    (
        &["forklift certification", "forklift license", "forklift"],
        "Forklift Certification",
    ),
    (&["first aid"], "First Aid"),
    (&["cpr"], "CPR"),
    (&["security clearance", "clearance"], "Security Clearance"),
    (&["license", "licence"], "License"),
    (&["python"], "Python"),
    (&["rust"], "Rust"),
    (&["java"], "Java"),
    (&["javascript"], "JavaScript"),
    (&["typescript"], "TypeScript"),
    (&["sql"], "SQL"),
    (&["aws"], "AWS"),
    (&["kubernetes"], "Kubernetes"),
    (&["docker"], "Docker"),
    (&["excel"], "Excel"),
];

pub const AFFIRMATIONS: &[&str] = &[
    "yes",
    "yeah",
    "yep",
    "i have",
    "ive got",
    "ive",
    "i hold",
    "i know",
    "i am certified",
    "im certified",
    "certified in",
    "experience with",
    "proficient in",
];

pub const NEGATIONS: &[&str] = &[
    "dont have",
    "do not have",
    "have no",
    "havent",
    "not have",
    "without",
    "no i",
];

pub const INDUSTRIES: &[(&[&str], &str)] = &[
    (&["technology", "tech", "software"], "Technology"),
    (&["healthcare", "health care", "hospital", "medical"], "Healthcare"),
    (&["finance", "financial", "banking", "fintech"], "Finance"),
    (&["logistics", "transportation", "shipping"], "Logistics"),
    (&["retail"], "Retail"),
    (&["education"], "Education"),
    (&["manufacturing"], "Manufacturing"),
    (&["hospitality"], "Hospitality"),
    (&["construction"], "Construction"),
    (&["energy"], "Energy"),
    (&["government", "public sector"], "Government"),
    (&["marketing"], "Marketing"),
];
