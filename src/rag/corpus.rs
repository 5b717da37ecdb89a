//! The FAQ knowledge base and corpus seeding.
//!
//! The corpus ships with the binary; seeding embeds every entry through the
//! fallback chain (batched, staggered) and writes the vectors to the store.
//! Records are keyed `faq-<n>` so reseeding replaces rather than duplicates.

use tracing::info;

use super::embeddings::EmbeddingChain;
use crate::store::VectorStore;
use crate::types::{FaqMetadata, Result};

/// Question/answer pairs about the portfolio owner, grouped by site page.
pub const FAQ_ENTRIES: &[(&str, &str)] = &[
    // ==================== Home/About ====================
    (
        "Tell me about Arnob Mahmud.",
        "Arnob Mahmud is a Full-Stack Web Developer and Automation & Digital Solutions \
         Engineer with 4+ years of experience delivering scalable, high-performance digital \
         products from concept to launch. He is a collaborative problem-solver known for \
         transforming complex requirements into elegant, user-focused solutions that drive \
         measurable business impact.",
    ),
    (
        "Where is Arnob Mahmud located?",
        "Arnob is based in Frankfurt, Germany. Specifically, his address is Groß-Umstadt, \
         Hessen, Germany. He has been living in Germany for over 12 years now.",
    ),
    (
        "What is Arnob's contact information?",
        "You can contact Arnob via email at arnobt78@gmail.com (primary), phone at \
         +49 1573 4664351, LinkedIn at https://www.linkedin.com/in/arnob-mahmud-05839655/, \
         GitHub at https://github.com/arnobt78/, or visit his portfolio at \
         https://www.arnobmahmud.com.",
    ),
    // ==================== Services ====================
    (
        "What services does Arnob offer?",
        "Arnob offers four main services: Web / Mobile Development, UI / UX Design, DevOps \
         & Testing (Test Automation/QA), and Cyber Security, from scratch to production as \
         scalable and secure solutions.",
    ),
    // ==================== Resume ====================
    (
        "What languages does Arnob speak?",
        "Arnob speaks English (C2 - Fluent), German (B1), Bengali (Native), Hindi, and Urdu \
         (Conversational). He is Bangladeshi by nationality and is currently based in \
         Frankfurt, Germany.",
    ),
    (
        "Where does Arnob currently work?",
        "Arnob currently works as a Full-Stack Web Developer as a Freelancer/Self-Employed \
         (Remote) since June 2025. Previously, he worked at Sernitas GmbH in Bochum, Germany \
         as a Full-Stack Web Developer Intern, where he led full-cycle builds using React, \
         Next.js, Express, Odoo (ERP) and AWS, improving delivery by 30%.",
    ),
    (
        "What is Arnob's educational background?",
        "Arnob has a Bachelor's degree in Computer Science & Engineering from the Military \
         Institute of Science and Technology (MIST), Dhaka, Bangladesh, and a Master's \
         degree in High Integrity Systems from Frankfurt University of Applied Sciences, \
         Frankfurt, Germany.",
    ),
    (
        "What are Arnob's technical skills?",
        "Arnob's skills span Frontend (React, Next.js, Angular, TypeScript, Tailwind CSS), \
         Backend (Node.js/Express.js, .NET, C++, Python/Flask/Django, PHP/Laravel), \
         Databases (PostgreSQL/Supabase/NeonDB, MongoDB, Firebase, Prisma, Drizzle ORM), \
         Testing (Selenium E2E, Cypress, Jest), and Cloud & DevOps (AWS, Docker, \
         Kubernetes, CI/CD with GitHub Actions, Vercel).",
    ),
    // ==================== Projects ====================
    (
        "What projects has Arnob worked on?",
        "Arnob has worked on 40+ real-world projects including a RAG-AI ChatBot (Redis \
         Vector + QStash + Next.js), a HealthCare Doctor Appointment Management System \
         (Next.js + Appwrite + Twilio), an IoT Embedded MotorSync Intelligence Platform \
         (C++/.NET/React), and a Hotel Booking Management System (React MERN). Many more \
         open source projects are available at https://github.com/arnobt78.",
    ),
    // ==================== Availability ====================
    (
        "Is Arnob available for new projects?",
        "Yes, Arnob is currently self-employed and actively looking for new opportunities. \
         He is open to freelance, part-time, or full-time roles and can start immediately \
         within a week.",
    ),
    // ==================== Personal ====================
    (
        "What are Arnob's hobbies?",
        "Arnob enjoys listening to metal and rock music, walking in nature, loving animals, \
         watching TV series and anime, gardening, and attending concerts and festivals.",
    ),
];

/// Embed the full FAQ corpus and write it to the vector store.
///
/// Each entry is embedded as `"<question> <answer>"` so both phrasings of a
/// visitor question can match. Returns the number of seeded records.
pub async fn seed_corpus(chain: &EmbeddingChain, store: &dyn VectorStore) -> Result<usize> {
    let texts: Vec<String> = FAQ_ENTRIES
        .iter()
        .map(|(question, answer)| format!("{question} {answer}"))
        .collect();

    let embeddings = chain.embed_batch(&texts).await?;

    for (i, ((question, answer), embedding)) in FAQ_ENTRIES.iter().zip(&embeddings).enumerate() {
        let metadata = FaqMetadata {
            question: (*question).to_string(),
            answer: (*answer).to_string(),
        };
        store
            .put(&format!("faq-{}", i + 1), embedding, &metadata)
            .await?;
    }

    info!(count = embeddings.len(), "seeded FAQ corpus");
    Ok(embeddings.len())
}
