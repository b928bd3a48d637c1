use particle_id::{
    sm_elementary_particles::{
        bottom, charm, electron_neutrino, muon_neutrino, tau_neutrino, top,
    },
    ParticleID,
};

/// Neutrinos, excluded from jet clustering
pub const NEUTRINOS: [ParticleID; 3] = [electron_neutrino, muon_neutrino, tau_neutrino];
/// The three heaviest quarks
pub const HEAVY_QUARKS: [ParticleID; 3] = [charm, bottom, top];

// (code, name, charge in units of e/3) for particles with positive codes
const SPECIES: &[(i32, &str, i32)] = &[
    (1, "d", -1),
    (2, "u", 2),
    (3, "s", -1),
    (4, "c", 2),
    (5, "b", -1),
    (6, "t", 2),
    (11, "e-", -3),
    (12, "nu_e", 0),
    (13, "mu-", -3),
    (14, "nu_mu", 0),
    (15, "tau-", -3),
    (16, "nu_tau", 0),
    (21, "g", 0),
    (22, "gamma", 0),
    (23, "Z0", 0),
    (24, "W+", 3),
    (25, "h0", 0),
    (111, "pi0", 0),
    (113, "rho0", 0),
    (130, "K_L0", 0),
    (211, "pi+", 3),
    (213, "rho+", 3),
    (221, "eta", 0),
    (223, "omega", 0),
    (310, "K_S0", 0),
    (311, "K0", 0),
    (313, "K*0", 0),
    (321, "K+", 3),
    (323, "K*+", 3),
    (331, "eta'", 0),
    (333, "phi", 0),
    (411, "D+", 3),
    (421, "D0", 0),
    (431, "D_s+", 3),
    (443, "J/psi", 0),
    (511, "B0", 0),
    (521, "B+", 3),
    (531, "B_s0", 0),
    (2101, "ud_0", 1),
    (2112, "n0", 0),
    (2203, "uu_1", 4),
    (2212, "p+", 3),
    (3122, "Lambda0", 0),
    (3222, "Sigma+", 3),
    (3312, "Xi-", -3),
    (4122, "Lambda_c+", 3),
    (5122, "Lambda_b0", 0),
];

// particles that are their own antiparticle
const SELF_CONJUGATE: &[i32] = &[21, 22, 23, 25, 111, 113, 130, 221, 223, 310, 331, 333, 443];

fn lookup(id: ParticleID) -> Option<&'static (i32, &'static str, i32)> {
    let code = id.id().abs();
    SPECIES.iter().find(|(c, _, _)| *c == code)
}

/// Human-readable name of a particle species
///
/// Unknown codes are rendered as their numeric value.
pub fn name(id: ParticleID) -> String {
    let code = id.id();
    let Some((_, name, charge)) = lookup(id) else {
        return code.to_string();
    };
    if code > 0 || SELF_CONJUGATE.contains(&code.abs()) {
        return name.to_string();
    }
    // antiparticle: flip the charge sign or prepend "anti"
    if let Some(stem) = name.strip_suffix('+') {
        format!("{stem}-")
    } else if let Some(stem) = name.strip_suffix('-') {
        format!("{stem}+")
    } else if *charge == 0 || code.abs() < 10 {
        format!("{name}bar")
    } else {
        format!("anti-{name}")
    }
}

pub fn is_neutrino(id: ParticleID) -> bool {
    NEUTRINOS.contains(&id.abs())
}

pub fn is_heavy_quark(id: ParticleID) -> bool {
    HEAVY_QUARKS.contains(&id.abs())
}
