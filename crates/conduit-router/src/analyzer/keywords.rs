//! Curated keyword sets

pub(crate) const COMPLEX: &[&str] = &[
    "strategy", "plan", "analyze", "predict", "calculate", "solve", "design", "implement",
    "optimize", "evaluate", "compare", "contrast", "synthesize", "integrate", "develop", "create",
    "build", "construct", "formulate",
];

pub(crate) const QUESTION: &[&str] = &["why", "how", "what", "when", "where", "which"];

pub(crate) const EMOTIONAL: &[&str] = &[
    "feel", "emotion", "stress", "anxiety", "happy", "sad", "worried", "excited", "scared",
    "afraid", "frustrated", "angry", "depressed", "lonely", "confused", "overwhelmed",
    "motivated", "inspired", "hopeful", "disappointed", "proud",
];

pub(crate) const PERSONAL_PRONOUNS: &[&str] = &["i", "me", "my", "myself", "we", "us", "our"];

pub(crate) const REASONING: &[&str] = &[
    "why", "how", "explain", "because", "reason", "logic", "cause", "effect", "analyze",
    "evaluate", "compare", "contrast", "deduce", "infer", "conclude",
];

pub(crate) const CREATIVITY: &[&str] = &[
    "create", "design", "imagine", "generate", "build", "make", "develop", "innovate", "invent",
    "brainstorm", "creative", "artistic", "original", "unique", "novel", "story", "write",
    "compose", "draw", "paint",
];

pub(crate) const EMPATHY: &[&str] = &[
    "help", "support", "understand", "listen", "care", "feel", "emotion", "advice", "guidance",
    "comfort", "encourage", "motivate", "inspire", "relationship", "friendship", "family", "love",
    "trust", "empathy",
];

pub(crate) const RESEARCH: &[&str] = &[
    "research", "find", "search", "investigate", "explore", "discover", "information", "data",
    "facts", "evidence", "study", "survey", "latest", "current", "recent", "news", "trends",
    "statistics",
];

pub(crate) const PLANNING: &[&str] = &[
    "plan", "strategy", "roadmap", "timeline", "schedule", "organize", "structure", "framework",
    "approach", "method", "process", "steps", "goals", "objectives", "milestones", "deadline",
    "project",
];

pub(crate) const URGENCY_HIGH: &[&str] =
    &["urgent", "asap", "immediately", "emergency", "crisis", "deadline"];

pub(crate) const DOMAIN_ACADEMIC: &[&str] = &[
    "study", "learn", "education", "school", "college", "university", "course", "exam", "test",
    "homework", "assignment",
];

pub(crate) const DOMAIN_CAREER: &[&str] = &[
    "job", "career", "work", "interview", "resume", "skills", "professional", "industry",
    "company", "business",
];

pub(crate) const DOMAIN_TECHNICAL: &[&str] = &[
    "code", "programming", "software", "technology", "computer", "algorithm", "database", "api",
    "development",
];

pub(crate) const DOMAIN_CREATIVE: &[&str] = &[
    "art", "design", "creative", "music", "writing", "story", "poetry", "painting", "drawing",
    "photography",
];

pub(crate) const DOMAIN_PERSONAL: &[&str] = &[
    "personal", "relationship", "family", "health", "fitness", "hobby", "interest", "lifestyle",
];

pub(crate) const IMAGES: &[&str] = &[
    "image", "picture", "photo", "screenshot", "visual", "see", "look", "show", "display",
];

pub(crate) const CODE: &[&str] = &[
    "code", "function", "variable", "class", "method", "api", "sql", "javascript", "python",
    "java",
];

pub(crate) const MATH: &[&str] = &[
    "calculate", "equation", "formula", "solve", "math", "algebra", "geometry", "statistics",
    "probability",
];

pub(crate) const PERSONAL_INFO: &[&str] = &[
    "my name", "i am", "i live", "my age", "my phone", "my email", "my address", "personal",
    "private",
];

pub(crate) const POSITIVE: &[&str] = &[
    "happy", "good", "great", "excellent", "wonderful", "amazing", "fantastic", "love", "like",
    "enjoy", "excited",
];

pub(crate) const NEGATIVE: &[&str] = &[
    "sad", "bad", "terrible", "awful", "hate", "dislike", "angry", "frustrated", "disappointed",
    "worried", "scared",
];
